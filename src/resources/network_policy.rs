//! NetworkPolicy generation for addon catalogs
//!
//! OLM pulls bundle metadata from catalog pods over gRPC. Clusters with a
//! default-deny posture block that traffic unless a policy opens the registry
//! port on the catalog pods of the addon.

use k8s_openapi::api::networking::v1::{
    NetworkPolicy, NetworkPolicyIngressRule, NetworkPolicyPort, NetworkPolicySpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;

use crate::crd::{Addon, AddonInstallOLMCommon};
use crate::resources::common::owned_metadata;
use crate::resources::olm::catalog_source_name;

/// Port of the catalog registry server
pub const CATALOG_GRPC_PORT: i32 = 50051;

/// Label OLM puts on catalog pods
pub const CATALOG_SOURCE_POD_LABEL: &str = "olm.catalogSource";

pub fn network_policy_name(addon: &Addon) -> String {
    format!("addon-{}-catalogs", addon.name_any())
}

/// Ingress policy for the primary and additional catalog pods of an addon
pub fn generate_catalog_network_policy(
    addon: &Addon,
    install: &AddonInstallOLMCommon,
) -> NetworkPolicy {
    let catalogs: Vec<String> = std::iter::once(catalog_source_name(addon))
        .chain(
            install
                .additional_catalog_sources
                .iter()
                .map(|c| c.name.clone()),
        )
        .collect();

    let pod_selector = LabelSelector {
        match_expressions: Some(vec![LabelSelectorRequirement {
            key: CATALOG_SOURCE_POD_LABEL.to_string(),
            operator: "In".to_string(),
            values: Some(catalogs),
        }]),
        ..Default::default()
    };

    NetworkPolicy {
        metadata: owned_metadata(addon, &network_policy_name(addon), Some(&install.namespace)),
        spec: Some(NetworkPolicySpec {
            pod_selector: Some(pod_selector),
            ingress: Some(vec![NetworkPolicyIngressRule {
                from: None,
                ports: Some(vec![NetworkPolicyPort {
                    port: Some(IntOrString::Int(CATALOG_GRPC_PORT)),
                    protocol: Some("TCP".to_string()),
                    ..Default::default()
                }]),
            }]),
            policy_types: Some(vec!["Ingress".to_string()]),
            ..Default::default()
        }),
    }
}
