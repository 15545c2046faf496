use async_trait::async_trait;
use tracing::info;

use super::{Phase, install_or_report};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::crd::Addon;
use crate::resources::olm::generate_operator_group;

/// OperatorGroup scoping the addon operator to its target namespaces
pub struct OperatorGroupPhase;

#[async_trait]
impl Phase for OperatorGroupPhase {
    fn name(&self) -> &'static str {
        "operator-group"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        let Some(install) = install_or_report(ctx, addon) else {
            return Ok(ReconcileResult::Stop);
        };

        let mut desired = generate_operator_group(addon, &install);
        let name = desired.metadata.name.clone().unwrap_or_default();

        match ctx.store.get_operator_group(&install.namespace, &name).await? {
            None => {
                info!(operator_group = %name, "Creating OperatorGroup");
                ctx.store.create_operator_group(&desired).await?;
            }
            Some(existing) if existing.spec != desired.spec => {
                info!(operator_group = %name, "Updating OperatorGroup");
                desired.metadata.resource_version = existing.metadata.resource_version;
                ctx.store.update_operator_group(&desired).await?;
            }
            Some(_) => {}
        }

        Ok(ReconcileResult::Continue)
    }
}
