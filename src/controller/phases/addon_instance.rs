use async_trait::async_trait;
use tracing::info;

use super::{Phase, install_or_report};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::crd::{ADDON_INSTANCE_NAME, Addon, DEFAULT_HEARTBEAT_UPDATE_PERIOD};
use crate::resources::addon_instance::generate_addon_instance;

/// Ensures the AddonInstance exists in the install namespace
pub struct AddonInstancePhase;

#[async_trait]
impl Phase for AddonInstancePhase {
    fn name(&self) -> &'static str {
        "addon-instance"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        let Some(install) = install_or_report(ctx, addon) else {
            return Ok(ReconcileResult::Stop);
        };

        match ctx
            .store
            .get_addon_instance(&install.namespace, ADDON_INSTANCE_NAME)
            .await?
        {
            None => {
                info!(namespace = %install.namespace, "Creating AddonInstance");
                ctx.store
                    .create_addon_instance(&generate_addon_instance(addon, &install.namespace))
                    .await?;
            }
            Some(mut existing) if existing.spec.heartbeat_update_period.is_none() => {
                existing.spec.heartbeat_update_period =
                    Some(DEFAULT_HEARTBEAT_UPDATE_PERIOD.to_string());
                ctx.store.update_addon_instance(&existing).await?;
            }
            Some(_) => {}
        }

        Ok(ReconcileResult::Continue)
    }
}
