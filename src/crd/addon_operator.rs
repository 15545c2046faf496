use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::Condition;

/// Name of the singleton AddonOperator object
pub const DEFAULT_ADDON_OPERATOR_NAME: &str = "addon-operator";

/// AddonOperator holds operator-wide settings such as the global pause switch
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "addons.managed.openshift.io",
    version = "v1alpha1",
    kind = "AddonOperator",
    plural = "addonoperators",
    status = "AddonOperatorStatus",
    printcolumn = r#"{"name":"Paused", "type":"boolean", "jsonPath":".spec.paused"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddonOperatorSpec {
    /// Pauses reconciliation of every Addon
    #[serde(default)]
    pub paused: bool,

    /// Fleet API connection settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocm: Option<AddonOperatorOcm>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonOperatorOcm {
    /// Base URL of the fleet API
    pub endpoint: String,

    /// Secret holding the fleet API credentials
    pub secret: ClusterSecretReference,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct ClusterSecretReference {
    pub name: String,
    pub namespace: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonOperatorStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
