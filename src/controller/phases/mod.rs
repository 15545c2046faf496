//! Ordered reconcile phases of the Addon pipeline

mod addon_instance;
mod catalog_source;
mod csv;
mod namespace;
mod network_policy;
mod operator_group;
mod subscription;

pub use addon_instance::AddonInstancePhase;
pub use catalog_source::{AdditionalCatalogSourcesPhase, CatalogSourcePhase};
pub use csv::{CsvPhase, CsvState, csv_state};
pub use namespace::NamespacePhase;
pub use network_policy::CatalogSourceNetworkPolicyPhase;
pub use operator_group::OperatorGroupPhase;
pub use subscription::SubscriptionPhase;

use async_trait::async_trait;

use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::controller::status::report_configuration_error;
use crate::crd::{Addon, AddonInstallOLMCommon};

/// One step of the pipeline
#[async_trait]
pub trait Phase: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult>;
}

/// Phases in the order they run
pub fn default_phases() -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(NamespacePhase),
        Box::new(AddonInstancePhase),
        Box::new(OperatorGroupPhase),
        Box::new(CatalogSourceNetworkPolicyPhase),
        Box::new(CatalogSourcePhase),
        Box::new(AdditionalCatalogSourcesPhase),
        Box::new(SubscriptionPhase),
        Box::new(CsvPhase),
    ]
}

/// Check the OLM install settings of the addon
pub fn validate_install(addon: &Addon) -> std::result::Result<&AddonInstallOLMCommon, String> {
    let install_type = addon.spec.install.type_;
    let install = addon
        .install_config()
        .ok_or_else(|| format!("install settings for {} are missing", install_type))?;

    let required = [
        ("namespace", &install.namespace),
        ("packageName", &install.package_name),
        ("channel", &install.channel),
        ("catalogSourceImage", &install.catalog_source_image),
    ];
    for (field, value) in required {
        if value.is_empty() {
            return Err(format!("{} is required for {}", field, install_type));
        }
    }

    Ok(install)
}

/// Validated install settings, or the configuration error already recorded on
/// the addon
pub(crate) fn install_or_report(ctx: &Context, addon: &mut Addon) -> Option<AddonInstallOLMCommon> {
    match validate_install(addon) {
        Ok(install) => Some(install.clone()),
        Err(message) => {
            report_configuration_error(addon, &message, ctx.now());
            None
        }
    }
}
