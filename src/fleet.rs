//! Fleet management API surface
//!
//! The operator reports upgrade progress and addon health to a remote fleet
//! service. Only the client contract lives here; the HTTP transport is
//! provided by whoever implements [`FleetClient`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crd::{AddonOperatorOcm, UpgradePolicyValue};

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("client configuration error: {0}")]
    Config(String),
}

impl FleetError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FleetError::Request { status, .. } => *status >= 500 || *status == 429,
            FleetError::NotFound(_) => false,
            FleetError::Transport(_) => true,
            FleetError::Config(_) => false,
        }
    }
}

/// Upgrade policy as stored by the fleet service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpgradePolicyState {
    pub id: String,
    pub value: UpgradePolicyValue,
    #[serde(default)]
    pub description: String,
}

/// Change sent when an upgrade makes progress
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UpgradePolicyPatch {
    pub id: String,
    pub value: UpgradePolicyValue,
    pub description: String,
}

/// One condition as mirrored to the fleet service
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StatusCondition {
    pub status_type: String,
    pub status_value: String,
    pub reason: String,
    pub message: String,
}

/// Addon health report
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AddonStatusReport {
    pub addon_id: String,
    pub correlation_id: String,
    pub status_conditions: Vec<StatusCondition>,
}

/// Client for the fleet management API
#[async_trait]
pub trait FleetClient: Send + Sync {
    async fn get_upgrade_policy(&self, id: &str) -> Result<UpgradePolicyState, FleetError>;

    async fn patch_upgrade_policy(&self, patch: UpgradePolicyPatch) -> Result<(), FleetError>;

    /// `None` when no status was ever posted for the addon
    async fn get_addon_status(&self, addon_id: &str)
    -> Result<Option<AddonStatusReport>, FleetError>;

    async fn post_addon_status(&self, report: AddonStatusReport) -> Result<(), FleetError>;

    async fn patch_addon_status(&self, report: AddonStatusReport) -> Result<(), FleetError>;
}

/// Builds a client from the AddonOperator connection settings
#[async_trait]
pub trait FleetClientFactory: Send + Sync {
    async fn build(&self, ocm: &AddonOperatorOcm) -> Result<Arc<dyn FleetClient>, FleetError>;
}
