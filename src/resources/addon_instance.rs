//! Namespace and AddonInstance generation

use k8s_openapi::api::core::v1::Namespace;

use crate::crd::{
    ADDON_INSTANCE_NAME, Addon, AddonInstance, AddonInstanceSpec, DEFAULT_HEARTBEAT_UPDATE_PERIOD,
};
use crate::resources::common::owned_metadata;

/// Namespace listed in `spec.namespaces`
pub fn generate_namespace(addon: &Addon, name: &str) -> Namespace {
    Namespace {
        metadata: owned_metadata(addon, name, None),
        ..Default::default()
    }
}

/// The AddonInstance the addon workload reports through
pub fn generate_addon_instance(addon: &Addon, namespace: &str) -> AddonInstance {
    AddonInstance {
        metadata: owned_metadata(addon, ADDON_INSTANCE_NAME, Some(namespace)),
        spec: AddonInstanceSpec {
            heartbeat_update_period: Some(DEFAULT_HEARTBEAT_UPDATE_PERIOD.to_string()),
            marked_for_deletion: false,
        },
        status: None,
    }
}
