//! OLM object generation for Addons
//!
//! Builds the OperatorGroup, CatalogSources and Subscription that make OLM
//! install the addon operator bundle.

use kube::ResourceExt;

use crate::crd::{
    AdditionalCatalogSource, Addon, AddonInstallOLMCommon, AddonInstallType, CatalogSource,
    CatalogSourceSpec, OperatorGroup, OperatorGroupSpec, Subscription, SubscriptionSpec,
    SubscriptionSpecConfig,
};
use crate::resources::common::owned_metadata;

/// Publisher shown on catalog sources created by the operator
pub const CATALOG_PUBLISHER: &str = "OSD Red Hat Addons";

/// Source type of every catalog the operator creates
pub const CATALOG_SOURCE_TYPE: &str = "grpc";

pub fn operator_group_name(addon: &Addon) -> String {
    addon.name_any()
}

pub fn catalog_source_name(addon: &Addon) -> String {
    format!("addon-{}-catalog", addon.name_any())
}

pub fn subscription_name(addon: &Addon) -> String {
    format!("addon-{}", addon.name_any())
}

/// OperatorGroup in the install namespace
///
/// Own-namespace installs target just that namespace, all-namespace installs
/// leave the target list empty.
pub fn generate_operator_group(addon: &Addon, install: &AddonInstallOLMCommon) -> OperatorGroup {
    let target_namespaces = match addon.spec.install.type_ {
        AddonInstallType::OwnNamespace => vec![install.namespace.clone()],
        AddonInstallType::AllNamespaces => Vec::new(),
    };

    OperatorGroup {
        metadata: owned_metadata(
            addon,
            &operator_group_name(addon),
            Some(&install.namespace),
        ),
        spec: OperatorGroupSpec { target_namespaces },
    }
}

fn catalog_source(
    addon: &Addon,
    install: &AddonInstallOLMCommon,
    name: &str,
    image: &str,
) -> CatalogSource {
    CatalogSource {
        metadata: owned_metadata(addon, name, Some(&install.namespace)),
        spec: CatalogSourceSpec {
            source_type: CATALOG_SOURCE_TYPE.to_string(),
            image: image.to_string(),
            display_name: addon.spec.display_name.clone(),
            publisher: CATALOG_PUBLISHER.to_string(),
            secrets: install.pull_secret_name.iter().cloned().collect(),
        },
    }
}

/// Primary catalog serving the addon bundle
pub fn generate_catalog_source(addon: &Addon, install: &AddonInstallOLMCommon) -> CatalogSource {
    catalog_source(
        addon,
        install,
        &catalog_source_name(addon),
        &install.catalog_source_image,
    )
}

/// Catalog serving bundle dependencies
pub fn generate_additional_catalog_source(
    addon: &Addon,
    install: &AddonInstallOLMCommon,
    additional: &AdditionalCatalogSource,
) -> CatalogSource {
    catalog_source(addon, install, &additional.name, &additional.image)
}

/// Subscription to the addon package
///
/// `installPlanApproval` is left unset; whoever stores the object owns it.
pub fn generate_subscription(addon: &Addon, install: &AddonInstallOLMCommon) -> Subscription {
    let config = install.config.as_ref().map(|c| SubscriptionSpecConfig {
        env: c.env.clone(),
    });

    Subscription {
        metadata: owned_metadata(addon, &subscription_name(addon), Some(&install.namespace)),
        spec: SubscriptionSpec {
            catalog_source: catalog_source_name(addon),
            catalog_source_namespace: install.namespace.clone(),
            package: install.package_name.clone(),
            channel: install.channel.clone(),
            install_plan_approval: None,
            starting_csv: None,
            config,
        },
        status: None,
    }
}
