use async_trait::async_trait;
use tracing::info;

use super::Phase;
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::crd::Addon;
use crate::resources::addon_instance::generate_namespace;

/// Creates the namespaces listed in `spec.namespaces`
pub struct NamespacePhase;

#[async_trait]
impl Phase for NamespacePhase {
    fn name(&self) -> &'static str {
        "namespaces"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        for namespace in &addon.spec.namespaces {
            if ctx.store.get_namespace(&namespace.name).await?.is_some() {
                continue;
            }
            info!(namespace = %namespace.name, "Creating addon namespace");
            ctx.store
                .create_namespace(&generate_namespace(addon, &namespace.name))
                .await?;
        }
        Ok(ReconcileResult::Continue)
    }
}
