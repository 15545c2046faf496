//! Installation observation
//!
//! Follows the chain Subscription → InstallPlan → ClusterServiceVersion →
//! AddonInstance and turns what OLM reports into the `Installed`,
//! `Available` and upgrade conditions of the Addon.

use async_trait::async_trait;
use kube::ResourceExt;
use tracing::{debug, info};

use super::{Phase, install_or_report};
use crate::controller::context::Context;
use crate::controller::error::Result;
use crate::controller::result::{IMMEDIATE_REQUEUE, ReconcileResult};
use crate::controller::status::{
    condition_types, find_condition, is_condition_true, reasons, report_installed,
    report_not_installed, report_unready, report_upgrade_succeeded,
};
use crate::crd::{
    ADDON_INSTANCE_NAME, Addon, Approval, CSV_KIND, INSTALL_PLAN_PHASE_REQUIRES_APPROVAL,
    RichReference, operator_key,
};
use crate::resources::olm::subscription_name;

/// Condition OLM sets on CSV component references
const CSV_SUCCEEDED_CONDITION: &str = "Succeeded";

/// Install state of a ClusterServiceVersion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvState {
    Succeeded,
    Failed,
    Unknown,
}

/// Derive the CSV state from its `Succeeded` condition alone
pub fn csv_state(csv: &RichReference) -> CsvState {
    match csv
        .conditions
        .iter()
        .find(|c| c.type_ == CSV_SUCCEEDED_CONDITION)
        .map(|c| c.status.as_str())
    {
        Some("True") => CsvState::Succeeded,
        Some("False") => CsvState::Failed,
        _ => CsvState::Unknown,
    }
}

pub struct CsvPhase;

#[async_trait]
impl Phase for CsvPhase {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn execute(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        let Some(install) = install_or_report(ctx, addon) else {
            return Ok(ReconcileResult::Stop);
        };
        let requeue = ReconcileResult::RequeueAfter(ctx.config.requeue_interval);

        let subscription = ctx
            .store
            .get_subscription(&install.namespace, &subscription_name(addon))
            .await?;
        let Some(subscription) = subscription else {
            report_unready(addon, reasons::UNREADY_CSV, "Subscription not found", ctx.now());
            return Ok(requeue);
        };
        let Some(csv_name) = subscription.linked_csv().map(str::to_string) else {
            report_unready(
                addon,
                reasons::UNREADY_CSV,
                "Subscription has no CSV linked yet",
                ctx.now(),
            );
            return Ok(requeue);
        };

        // Operator events seen before this mapping existed were dropped
        let key = operator_key(&install.package_name, &install.namespace);
        if ctx.registry.register(&addon.name_any(), &key) {
            debug!(operator = %key, "Registered operator resource, requeueing");
            return Ok(ReconcileResult::RequeueAfter(IMMEDIATE_REQUEUE));
        }

        if subscription.spec.install_plan_approval == Some(Approval::Manual)
            && let Some(plan_ref) = subscription
                .status
                .as_ref()
                .and_then(|s| s.install_plan_ref.as_ref())
            && let Some(plan_name) = plan_ref.name.as_deref()
        {
            let plan_namespace = plan_ref.namespace.as_deref().unwrap_or(&install.namespace);
            let plan = ctx.store.get_install_plan(plan_namespace, plan_name).await?;
            let pending = plan
                .and_then(|p| p.status)
                .and_then(|s| s.phase)
                .is_some_and(|phase| phase == INSTALL_PLAN_PHASE_REQUIRES_APPROVAL);
            if pending {
                report_unready(
                    addon,
                    reasons::INSTALL_PLAN_PENDING,
                    &format!("InstallPlan {} is waiting for manual approval", plan_name),
                    ctx.now(),
                );
                return Ok(ReconcileResult::Stop);
            }
        }

        let operator = ctx.store.get_operator(&key).await?;
        let csv_ref = operator.as_ref().and_then(|op| {
            op.component_refs().iter().find(|r| {
                r.kind.as_deref() == Some(CSV_KIND)
                    && r.name.as_deref() == Some(csv_name.as_str())
                    && r.namespace.as_deref() == Some(install.namespace.as_str())
            })
        });

        let Some(csv_ref) = csv_ref else {
            let label = addon.delete_config_map_label();
            let confirmations = ctx
                .store
                .list_config_maps_uncached(&install.namespace, &label)
                .await?;
            if !confirmations.is_empty() {
                info!("Addon was uninstalled through the delete ConfigMap");
                report_not_installed(addon, "Addon has been uninstalled", ctx.now());
                return Ok(ReconcileResult::Stop);
            }
            report_unready(
                addon,
                reasons::MISSING_CSV,
                &format!("ClusterServiceVersion {} is missing", csv_name),
                ctx.now(),
            );
            return Ok(requeue);
        };

        match csv_state(csv_ref) {
            CsvState::Succeeded => {}
            CsvState::Failed => {
                report_unready(
                    addon,
                    reasons::UNREADY_CSV,
                    &format!("ClusterServiceVersion {} failed to install", csv_name),
                    ctx.now(),
                );
                return Ok(requeue);
            }
            CsvState::Unknown => {
                report_unready(
                    addon,
                    reasons::UNREADY_CSV,
                    &format!("ClusterServiceVersion {} is not ready yet", csv_name),
                    ctx.now(),
                );
                return Ok(requeue);
            }
        }

        if addon.spec.install_ack_required {
            let instance = ctx
                .store
                .get_addon_instance(&install.namespace, ADDON_INSTANCE_NAME)
                .await?;
            let acked = instance
                .is_some_and(|i| is_condition_true(i.conditions(), condition_types::INSTALLED));
            if !acked {
                report_unready(
                    addon,
                    reasons::UNREADY_ADDON_INSTANCE,
                    "Waiting for the addon to acknowledge installation",
                    ctx.now(),
                );
                return Ok(requeue);
            }
        }

        report_installed(addon, ctx.now());

        let csv_key = format!("{}/{}", install.namespace, csv_name);
        let last_observed = addon
            .status
            .as_ref()
            .and_then(|s| s.last_observed_available_csv.as_deref());
        let upgrading =
            find_condition(addon.conditions(), condition_types::UPGRADE_STARTED).is_some();
        if last_observed != Some(csv_key.as_str()) && upgrading {
            info!(csv = %csv_key, "Upgrade concluded");
            report_upgrade_succeeded(addon, ctx.now());
        }
        addon.status_mut().last_observed_available_csv = Some(csv_key);

        Ok(ReconcileResult::Continue)
    }
}
