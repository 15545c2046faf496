//! Typed views of the OLM objects the operator creates or observes
//!
//! Only the fields the operator reads or writes are modelled. Unknown fields
//! sent by the API server are ignored on deserialization.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::EnvObject;

/// Component reference kind identifying a ClusterServiceVersion
pub const CSV_KIND: &str = "ClusterServiceVersion";

/// InstallPlan phase reported while waiting for a manual approval
pub const INSTALL_PLAN_PHASE_REQUIRES_APPROVAL: &str = "RequiresApproval";

/// OperatorGroup scoping the operator bundle to a set of namespaces
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "operators.coreos.com",
    version = "v1",
    kind = "OperatorGroup",
    plural = "operatorgroups",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct OperatorGroupSpec {
    /// Empty means all namespaces
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub target_namespaces: Vec<String>,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "CatalogSource",
    plural = "catalogsources",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSourceSpec {
    pub source_type: String,

    #[serde(default)]
    pub image: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub publisher: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

/// Approval strategy of InstallPlans created for a Subscription
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum Approval {
    Automatic,
    Manual,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "Subscription",
    plural = "subscriptions",
    namespaced,
    status = "SubscriptionStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSpec {
    /// Name of the CatalogSource providing the package
    #[serde(rename = "source")]
    pub catalog_source: String,

    #[serde(rename = "sourceNamespace")]
    pub catalog_source_namespace: String,

    /// Package name
    #[serde(rename = "name")]
    pub package: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,

    /// Owned by the tenant once set; the operator never overwrites it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_plan_approval: Option<Approval>,

    #[serde(
        rename = "startingCSV",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub starting_csv: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SubscriptionSpecConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct SubscriptionSpecConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvObject>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    #[serde(rename = "currentCSV", default, skip_serializing_if = "Option::is_none")]
    pub current_csv: Option<String>,

    #[serde(rename = "installedCSV", default, skip_serializing_if = "Option::is_none")]
    pub installed_csv: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_plan_ref: Option<ObjectReference>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct ObjectReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Subscription {
    /// CSV currently linked to the subscription, falling back to the installed one
    pub fn linked_csv(&self) -> Option<&str> {
        let status = self.status.as_ref()?;
        status
            .current_csv
            .as_deref()
            .or(status.installed_csv.as_deref())
            .filter(|csv| !csv.is_empty())
    }
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "operators.coreos.com",
    version = "v1alpha1",
    kind = "InstallPlan",
    plural = "installplans",
    namespaced,
    status = "InstallPlanStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct InstallPlanSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval: Option<Approval>,

    #[serde(default)]
    pub approved: bool,

    #[serde(
        rename = "clusterServiceVersionNames",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub cluster_service_version_names: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct InstallPlanStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// Aggregated view OLM keeps for every installed package, named `<package>.<namespace>`
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "operators.coreos.com",
    version = "v1",
    kind = "Operator",
    plural = "operators",
    status = "OperatorStatus"
)]
pub struct OperatorSpec {}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct OperatorStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct Components {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub refs: Vec<RichReference>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RichReference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<ComponentCondition>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct ComponentCondition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Operator {
    /// Component references recorded in the Operator status
    pub fn component_refs(&self) -> &[RichReference] {
        self.status
            .as_ref()
            .and_then(|s| s.components.as_ref())
            .map(|c| c.refs.as_slice())
            .unwrap_or_default()
    }
}

/// Name OLM gives the aggregated Operator object of a package
pub fn operator_key(package: &str, namespace: &str) -> String {
    format!("{}.{}", package, namespace)
}
