use async_trait::async_trait;
use tracing::info;

use super::{Phase, install_or_report};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::controller::status::{reasons, report_unready};
use crate::crd::Addon;
use crate::resources::olm::generate_subscription;

/// Subscription to the addon package
///
/// The install plan approval mode of a stored Subscription always wins over
/// the generated one, so tenants can switch to manual approval.
pub struct SubscriptionPhase;

#[async_trait]
impl Phase for SubscriptionPhase {
    fn name(&self) -> &'static str {
        "subscription"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        let Some(install) = install_or_report(ctx, addon) else {
            return Ok(ReconcileResult::Stop);
        };

        let mut desired = generate_subscription(addon, &install);
        let name = desired.metadata.name.clone().unwrap_or_default();

        let current = match ctx.store.get_subscription(&install.namespace, &name).await? {
            None => {
                info!(subscription = %name, "Creating Subscription");
                ctx.store.create_subscription(&desired).await?;
                None
            }
            Some(existing) => {
                desired.spec.install_plan_approval = existing.spec.install_plan_approval;
                if existing.spec != desired.spec {
                    info!(subscription = %name, "Updating Subscription");
                    desired.metadata.resource_version = existing.metadata.resource_version.clone();
                    ctx.store.update_subscription(&desired).await?;
                }
                Some(existing)
            }
        };

        if current.as_ref().and_then(|s| s.linked_csv()).is_none() {
            report_unready(
                addon,
                reasons::UNREADY_CSV,
                "Subscription has no CSV linked yet",
                ctx.now(),
            );
            return Ok(ReconcileResult::RequeueAfter(ctx.config.requeue_interval));
        }

        Ok(ReconcileResult::Continue)
    }
}
