//! AddonInstance CRD definition
//!
//! One AddonInstance lives in the install namespace of every Addon. The addon
//! workload uses it to report heartbeats and to acknowledge installation and
//! deletion requests.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Condition;

/// Fixed name of the AddonInstance object in each namespace
pub const ADDON_INSTANCE_NAME: &str = "addon-instance";

/// Heartbeat period written to newly created AddonInstances
pub const DEFAULT_HEARTBEAT_UPDATE_PERIOD: &str = "10s";

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "addons.managed.openshift.io",
    version = "v1alpha1",
    kind = "AddonInstance",
    plural = "addoninstances",
    namespaced,
    status = "AddonInstanceStatus",
    printcolumn = r#"{"name":"Last Heartbeat", "type":"date", "jsonPath":".status.lastHeartbeatTime"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstanceSpec {
    /// How often the addon workload is expected to report a heartbeat
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_update_period: Option<String>,

    /// Set by the operator to ask the workload to prepare for deletion
    #[serde(default)]
    pub marked_for_deletion: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstanceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl AddonInstance {
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }
}
