use async_trait::async_trait;
use tracing::info;

use super::{Phase, install_or_report};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::crd::Addon;
use crate::resources::network_policy::generate_catalog_network_policy;

/// Opens the catalog registry port before any CatalogSource exists
pub struct CatalogSourceNetworkPolicyPhase;

#[async_trait]
impl Phase for CatalogSourceNetworkPolicyPhase {
    fn name(&self) -> &'static str {
        "catalog-source-network-policy"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        let Some(install) = install_or_report(ctx, addon) else {
            return Ok(ReconcileResult::Stop);
        };

        let mut desired = generate_catalog_network_policy(addon, &install);
        let name = desired.metadata.name.clone().unwrap_or_default();

        match ctx.store.get_network_policy(&install.namespace, &name).await? {
            None => {
                info!(network_policy = %name, "Creating catalog NetworkPolicy");
                ctx.store.create_network_policy(&desired).await?;
            }
            Some(existing) if existing.spec != desired.spec => {
                info!(network_policy = %name, "Updating catalog NetworkPolicy");
                desired.metadata.resource_version = existing.metadata.resource_version;
                ctx.store.update_network_policy(&desired).await?;
            }
            Some(_) => {}
        }

        Ok(ReconcileResult::Continue)
    }
}
