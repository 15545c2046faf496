use async_trait::async_trait;
use tracing::info;

use super::{Phase, install_or_report};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::controller::status::report_configuration_error;
use crate::crd::{Addon, CatalogSource};
use crate::resources::olm::{generate_additional_catalog_source, generate_catalog_source};

async fn ensure_catalog_source(ctx: &Context, mut desired: CatalogSource) -> Result<()> {
    let name = desired.metadata.name.clone().unwrap_or_default();
    let namespace = desired.metadata.namespace.clone().unwrap_or_default();

    match ctx.store.get_catalog_source(&namespace, &name).await? {
        None => {
            info!(catalog_source = %name, "Creating CatalogSource");
            ctx.store.create_catalog_source(&desired).await?;
        }
        Some(existing) if existing.spec != desired.spec => {
            info!(catalog_source = %name, "Updating CatalogSource");
            desired.metadata.resource_version = existing.metadata.resource_version;
            ctx.store.update_catalog_source(&desired).await?;
        }
        Some(_) => {}
    }
    Ok(())
}

/// Catalog serving the addon bundle
pub struct CatalogSourcePhase;

#[async_trait]
impl Phase for CatalogSourcePhase {
    fn name(&self) -> &'static str {
        "catalog-source"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        let Some(install) = install_or_report(ctx, addon) else {
            return Ok(ReconcileResult::Stop);
        };

        ensure_catalog_source(ctx, generate_catalog_source(addon, &install)).await?;
        Ok(ReconcileResult::Continue)
    }
}

/// Catalogs serving bundle dependencies
pub struct AdditionalCatalogSourcesPhase;

#[async_trait]
impl Phase for AdditionalCatalogSourcesPhase {
    fn name(&self) -> &'static str {
        "additional-catalog-sources"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        let Some(install) = install_or_report(ctx, addon) else {
            return Ok(ReconcileResult::Stop);
        };

        if let Some(index) = install
            .additional_catalog_sources
            .iter()
            .position(|c| c.name.is_empty() || c.image.is_empty())
        {
            report_configuration_error(
                addon,
                &format!("additionalCatalogSources[{}] needs both name and image", index),
                ctx.now(),
            );
            return Ok(ReconcileResult::Stop);
        }

        for additional in &install.additional_catalog_sources {
            ensure_catalog_source(
                ctx,
                generate_additional_catalog_source(addon, &install, additional),
            )
            .await?;
        }
        Ok(ReconcileResult::Continue)
    }
}
