use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation whose presence marks the start of an Addon deletion
pub const DELETE_ANNOTATION: &str = "addons.managed.openshift.io/delete";

/// Annotation overriding how long the operator waits for a deletion ack
pub const DELETE_TIMEOUT_ANNOTATION: &str = "addons.managed.openshift.io/deletetimeout";

/// Addon is the Schema for the addons API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "addons.managed.openshift.io",
    version = "v1alpha1",
    kind = "Addon",
    plural = "addons",
    status = "AddonStatus",
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".spec.version"}"#,
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AddonSpec {
    /// Human readable name of the addon
    #[serde(default)]
    pub display_name: String,

    /// Version of the addon being installed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Stops reconciliation of this addon while true
    #[serde(default)]
    pub paused: bool,

    /// Namespaces created and owned for this addon
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<AddonNamespace>,

    /// Labels applied to every object created for the addon
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub common_labels: BTreeMap<String, String>,

    /// Annotations applied to every object created for the addon
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub common_annotations: BTreeMap<String, String>,

    /// Correlation identifier forwarded to the fleet API
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,

    /// How the addon is installed through OLM
    pub install: AddonInstallSpec,

    /// Wait for the addon workload to acknowledge a deletion request
    #[serde(default)]
    pub delete_ack_required: bool,

    /// Wait for the addon workload to acknowledge its installation
    #[serde(default)]
    pub install_ack_required: bool,

    /// Fleet upgrade policy this addon reports progress to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<AddonUpgradePolicy>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonNamespace {
    pub name: String,
}

/// Install strategy of the addon operator bundle
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum AddonInstallType {
    /// Operator watches only its own namespace
    #[default]
    #[serde(rename = "OLMOwnNamespace")]
    OwnNamespace,
    /// Operator watches every namespace
    #[serde(rename = "OLMAllNamespaces")]
    AllNamespaces,
}

impl std::fmt::Display for AddonInstallType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddonInstallType::OwnNamespace => write!(f, "OLMOwnNamespace"),
            AddonInstallType::AllNamespaces => write!(f, "OLMAllNamespaces"),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstallSpec {
    #[serde(rename = "type", default)]
    pub type_: AddonInstallType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub olm_own_namespace: Option<AddonInstallOLMCommon>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub olm_all_namespaces: Option<AddonInstallOLMCommon>,
}

/// OLM settings shared by both install types
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonInstallOLMCommon {
    /// Namespace the operator bundle is installed into
    #[serde(default)]
    pub namespace: String,

    /// OLM package name
    #[serde(default)]
    pub package_name: String,

    /// OLM channel to subscribe to
    #[serde(default)]
    pub channel: String,

    /// Image of the primary catalog
    #[serde(default)]
    pub catalog_source_image: String,

    /// Pull secret handed to the catalog sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_secret_name: Option<String>,

    /// Extra configuration injected into the Subscription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SubscriptionConfig>,

    /// Catalogs providing dependencies of the primary bundle
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_catalog_sources: Vec<AdditionalCatalogSource>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct EnvObject {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct AdditionalCatalogSource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct AddonUpgradePolicy {
    /// Identifier of the upgrade policy in the fleet API
    pub id: String,
}

/// Lifecycle phase of an Addon
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq, Hash)]
pub enum AddonPhase {
    #[default]
    Pending,
    Ready,
    Error,
    Terminating,
}

impl std::fmt::Display for AddonPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddonPhase::Pending => write!(f, "Pending"),
            AddonPhase::Ready => write!(f, "Ready"),
            AddonPhase::Error => write!(f, "Error"),
            AddonPhase::Terminating => write!(f, "Terminating"),
        }
    }
}

/// Status of the Addon
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonStatus {
    #[serde(default)]
    pub phase: AddonPhase,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    /// Spec version the operator last acted on
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub observed_version: String,

    /// `<namespace>/<name>` of the last CSV seen in the Succeeded phase
    #[serde(
        rename = "lastObservedAvailableCSV",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_observed_available_csv: Option<String>,

    /// Last upgrade policy state reported to the fleet API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_policy: Option<AddonUpgradePolicyStatus>,

    /// Hash of the status last reported to the fleet API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_status_hash: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddonUpgradePolicyStatus {
    pub id: String,
    pub value: UpgradePolicyValue,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Progress values understood by the fleet upgrade policy API
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpgradePolicyValue {
    Pending,
    Started,
    Completed,
    Failed,
}

/// Kubernetes-style condition
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    #[serde(rename = "type")]
    pub type_: String,

    /// Status of the condition: True, False, or Unknown
    pub status: String,

    /// Reason for the condition's last transition
    pub reason: String,

    /// Human-readable message
    pub message: String,

    /// Last time the condition transitioned
    pub last_transition_time: String,

    /// Generation observed when condition was set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Addon {
    /// The OLM settings for the configured install type, if present
    pub fn install_config(&self) -> Option<&AddonInstallOLMCommon> {
        match self.spec.install.type_ {
            AddonInstallType::OwnNamespace => self.spec.install.olm_own_namespace.as_ref(),
            AddonInstallType::AllNamespaces => self.spec.install.olm_all_namespaces.as_ref(),
        }
    }

    /// Whether the delete annotation is present
    pub fn is_marked_for_deletion(&self) -> bool {
        self.metadata
            .annotations
            .as_ref()
            .is_some_and(|a| a.contains_key(DELETE_ANNOTATION))
    }

    /// Raw value of the delete timeout override annotation
    pub fn delete_timeout_override(&self) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(DELETE_TIMEOUT_ANNOTATION))
            .map(String::as_str)
    }

    pub fn has_finalizer(&self, finalizer: &str) -> bool {
        self.metadata
            .finalizers
            .as_ref()
            .is_some_and(|f| f.iter().any(|x| x == finalizer))
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    /// Mutable status, created on first use
    pub fn status_mut(&mut self) -> &mut AddonStatus {
        self.status.get_or_insert_with(AddonStatus::default)
    }

    /// Label marking a ConfigMap that confirms the addon was uninstalled
    pub fn delete_config_map_label(&self) -> String {
        delete_config_map_label(self.metadata.name.as_deref().unwrap_or_default())
    }
}

/// Label key of the delete-confirmation ConfigMap for an addon
pub fn delete_config_map_label(addon_name: &str) -> String {
    format!("api.openshift.com/addon-{}-delete", addon_name)
}
