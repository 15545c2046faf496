//! Common utilities for Kubernetes resource generation
//!
//! Shared by every generator so that objects created for an Addon carry the
//! same labels, annotations and owner reference.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::ResourceExt;

use crate::crd::Addon;

/// API version for the Addon CRD
pub const API_VERSION: &str = "addons.managed.openshift.io/v1alpha1";

/// Kind for the Addon CRD
pub const KIND: &str = "Addon";

/// Operator field manager name
pub const FIELD_MANAGER: &str = "addon-operator";

/// Label pointing from a created object back to its Addon
pub const ADDON_LABEL: &str = "addons.managed.openshift.io/addon";

/// Generate an owner reference for an Addon
///
/// Objects owned this way are garbage collected once the Addon is gone.
pub fn owner_reference(addon: &Addon) -> OwnerReference {
    OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name: addon.name_any(),
        uid: addon.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Labels for every object created for an Addon
///
/// User supplied common labels are merged in but cannot override the addon
/// identifier.
pub fn addon_labels(addon: &Addon) -> BTreeMap<String, String> {
    let name = addon.name_any();
    let mut labels = BTreeMap::from([
        ("app.kubernetes.io/managed-by".to_string(), FIELD_MANAGER.to_string()),
        (ADDON_LABEL.to_string(), name),
    ]);

    for (key, value) in &addon.spec.common_labels {
        if key != ADDON_LABEL {
            labels.insert(key.clone(), value.clone());
        }
    }

    labels
}

/// Metadata of an object owned by the addon
pub fn owned_metadata(addon: &Addon, name: &str, namespace: Option<&str>) -> ObjectMeta {
    let annotations = if addon.spec.common_annotations.is_empty() {
        None
    } else {
        Some(addon.spec.common_annotations.clone())
    };

    ObjectMeta {
        name: Some(name.to_string()),
        namespace: namespace.map(str::to_string),
        labels: Some(addon_labels(addon)),
        annotations,
        owner_references: Some(vec![owner_reference(addon)]),
        ..Default::default()
    }
}
