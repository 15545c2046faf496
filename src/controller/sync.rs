//! Status mirroring to the fleet API
//!
//! Syncs run after the pipeline on every pass, whatever its outcome, and only
//! when a fleet client has been injected.

use async_trait::async_trait;
use kube::ResourceExt;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::status::{condition_types, is_condition_true};
use crate::crd::{Addon, AddonUpgradePolicyStatus, UpgradePolicyValue};
use crate::fleet::{AddonStatusReport, StatusCondition, UpgradePolicyPatch};

#[async_trait]
pub trait ExternalSync: Send + Sync {
    fn name(&self) -> &'static str;

    async fn sync(&self, ctx: &Context, addon: &mut Addon) -> Result<()>;
}

/// Syncs in the order they run
pub fn default_syncs() -> Vec<Box<dyn ExternalSync>> {
    vec![Box::new(UpgradePolicySync), Box::new(StatusReportingSync)]
}

/// Reports upgrade progress to the policy named in `spec.upgradePolicy`
pub struct UpgradePolicySync;

impl UpgradePolicySync {
    /// `completed` once Available, `started` until then
    fn desired_value(addon: &Addon) -> UpgradePolicyValue {
        if is_condition_true(addon.conditions(), condition_types::AVAILABLE) {
            UpgradePolicyValue::Completed
        } else {
            UpgradePolicyValue::Started
        }
    }
}

#[async_trait]
impl ExternalSync for UpgradePolicySync {
    fn name(&self) -> &'static str {
        "upgrade-policy"
    }

    async fn sync(&self, ctx: &Context, addon: &mut Addon) -> Result<()> {
        let Some(policy) = addon.spec.upgrade_policy.clone() else {
            return Ok(());
        };
        let Some(client) = ctx.coordinator.fleet_client().await else {
            return Ok(());
        };
        let value = Self::desired_value(addon);

        let version = addon.spec.version.clone();
        let already_reported = addon
            .status
            .as_ref()
            .and_then(|s| s.upgrade_policy.as_ref())
            .is_some_and(|p| p.id == policy.id && p.version == version && p.value == value);
        if already_reported {
            return Ok(());
        }

        let remote = client.get_upgrade_policy(&policy.id).await?;
        if remote.value != value {
            info!(policy = %policy.id, ?value, "Reporting upgrade policy progress");
            client
                .patch_upgrade_policy(UpgradePolicyPatch {
                    id: policy.id.clone(),
                    value,
                    description: format!("Addon {} upgrade to {}", addon.name_any(), version),
                })
                .await?;
        }

        let generation = addon.metadata.generation;
        addon.status_mut().upgrade_policy = Some(AddonUpgradePolicyStatus {
            id: policy.id,
            value,
            version,
            observed_generation: generation,
        });
        Ok(())
    }
}

/// Mirrors the Addon conditions to the fleet API when they change
pub struct StatusReportingSync;

impl StatusReportingSync {
    pub fn build_report(addon: &Addon) -> AddonStatusReport {
        AddonStatusReport {
            addon_id: addon.name_any(),
            correlation_id: addon.spec.correlation_id.clone(),
            status_conditions: addon
                .conditions()
                .iter()
                .map(|c| StatusCondition {
                    status_type: c.type_.clone(),
                    status_value: c.status.clone(),
                    reason: c.reason.clone(),
                    message: c.message.clone(),
                })
                .collect(),
        }
    }

    /// Stable digest of a report; timestamps are not part of it
    pub fn report_hash(report: &AddonStatusReport) -> Result<String> {
        let bytes = serde_json::to_vec(report)?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }
}

#[async_trait]
impl ExternalSync for StatusReportingSync {
    fn name(&self) -> &'static str {
        "status-reporting"
    }

    async fn sync(&self, ctx: &Context, addon: &mut Addon) -> Result<()> {
        if !ctx.config.status_reporting_enabled {
            return Ok(());
        }
        let Some(client) = ctx.coordinator.fleet_client().await else {
            return Ok(());
        };

        let report = Self::build_report(addon);
        let hash = Self::report_hash(&report)?;
        let unchanged = addon
            .status
            .as_ref()
            .and_then(|s| s.reported_status_hash.as_deref())
            == Some(hash.as_str());
        if unchanged {
            return Ok(());
        }

        if client.get_addon_status(&report.addon_id).await?.is_some() {
            debug!("Patching addon status in fleet API");
            client.patch_addon_status(report).await?;
        } else {
            debug!("Posting addon status to fleet API");
            client.post_addon_status(report).await?;
        }

        addon.status_mut().reported_status_hash = Some(hash);
        Ok(())
    }
}
