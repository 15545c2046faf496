//! Per-Addon reconcile pipeline
//!
//! A pass works on a copy of the Addon: it runs the guard steps (deletion,
//! pause, version change, finalizer) and the ordered phases, then the fleet
//! syncs, then persists the status. Every failure along the way is collected;
//! none of the later steps is skipped because an earlier one failed.

use std::sync::Arc;

use kube::ResourceExt;
use tracing::{debug, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::deletion::DeletionHandshake;
use crate::controller::error::{Error, MultiError, Result, RetryTracker};
use crate::controller::phases::{Phase, default_phases};
use crate::controller::result::ReconcileResult;
use crate::controller::status::{
    condition_types, find_condition, is_condition_true, reasons, remove_addon_condition,
    report_not_installed, report_paused, report_ready, report_terminating,
    report_upgrade_started,
};
use crate::controller::sync::{ExternalSync, default_syncs};
use crate::crd::Addon;

/// Finalizer keeping the Addon around until its cache entries are released
pub const FINALIZER: &str = "addons.managed.openshift.io/cache";

pub struct AddonReconciler {
    ctx: Arc<Context>,
    phases: Vec<Box<dyn Phase>>,
    deletion: DeletionHandshake,
    syncs: Vec<Box<dyn ExternalSync>>,
    retries: RetryTracker,
}

impl AddonReconciler {
    pub fn new(
        ctx: Arc<Context>,
        phases: Vec<Box<dyn Phase>>,
        deletion: DeletionHandshake,
        syncs: Vec<Box<dyn ExternalSync>>,
    ) -> Self {
        Self {
            ctx,
            phases,
            deletion,
            syncs,
            retries: RetryTracker::new(),
        }
    }

    /// Reconciler with the standard phases, deletion handlers and syncs
    pub fn with_defaults(ctx: Arc<Context>) -> Self {
        Self::new(
            ctx,
            default_phases(),
            DeletionHandshake::with_defaults(),
            default_syncs(),
        )
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    /// Consecutive failed passes per Addon
    pub fn retries(&self) -> &RetryTracker {
        &self.retries
    }

    /// Run one full pass for `addon`
    ///
    /// Holds the global pause read guard until the status is persisted, so a
    /// pause toggle never interleaves with a pass.
    #[instrument(skip(self, addon), fields(addon = %addon.name_any()))]
    pub async fn reconcile(
        &self,
        addon: &Addon,
    ) -> std::result::Result<ReconcileResult, MultiError> {
        let pause = self.ctx.coordinator.read_pause().await;
        let globally_paused = *pause;

        let mut working = addon.clone();
        let mut errors = MultiError::new();

        let result = match self.run_pipeline(&mut working, globally_paused).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Pipeline failed");
                errors.push(e);
                ReconcileResult::Stop
            }
        };

        for sync in &self.syncs {
            if let Err(e) = sync.sync(&self.ctx, &mut working).await {
                warn!(sync = sync.name(), error = %e, "Sync failed");
                errors.push(e);
            }
        }

        if let Some(health) = self.ctx.health_state.as_ref() {
            health.metrics.set_addon_available(
                &working.name_any(),
                is_condition_true(working.conditions(), condition_types::AVAILABLE),
            );
        }

        if let Err(e) = self.ctx.store.update_addon_status(&working).await {
            warn!(error = %e, "Failed to persist addon status");
            errors.push(e);
        }

        drop(pause);
        debug!(?result, errors = errors.len(), "Reconcile pass finished");
        errors.into_result(result)
    }

    async fn run_pipeline(
        &self,
        addon: &mut Addon,
        globally_paused: bool,
    ) -> Result<ReconcileResult> {
        let ctx = self.ctx.as_ref();
        let now = ctx.now();

        if addon.metadata.deletion_timestamp.is_some() {
            return self.release(addon).await;
        }

        if addon.is_marked_for_deletion() {
            let result = self.deletion.run(ctx, addon).await?;
            return Ok(match result {
                ReconcileResult::Continue => ReconcileResult::Stop,
                other => other,
            });
        }

        if globally_paused {
            report_paused(
                addon,
                reasons::ADDON_OPERATOR_PAUSED,
                "Addon operator is paused",
                now,
            );
            return Ok(ReconcileResult::Stop);
        }
        if addon.spec.paused {
            report_paused(addon, reasons::ADDON_PAUSED, "Addon is paused", now);
            return Ok(ReconcileResult::Stop);
        }
        remove_addon_condition(addon, condition_types::PAUSED);

        let observed_version = addon
            .status
            .as_ref()
            .map(|s| s.observed_version.as_str())
            .unwrap_or_default();
        if !addon.spec.version.is_empty()
            && !observed_version.is_empty()
            && addon.spec.version != observed_version
        {
            info!(from = observed_version, to = %addon.spec.version, "Addon upgrade started");
            report_upgrade_started(addon, now);
            return Ok(ReconcileResult::Stop);
        }

        if find_condition(addon.conditions(), condition_types::INSTALLED).is_none() {
            report_not_installed(addon, "Addon is not installed yet", now);
        }

        if !addon.has_finalizer(FINALIZER) {
            let mut finalizers = addon.finalizers().to_vec();
            finalizers.push(FINALIZER.to_string());
            ctx.store
                .update_addon_finalizers(addon, finalizers.clone())
                .await?;
            addon.metadata.finalizers = Some(finalizers);
            debug!("Added finalizer");
            return Ok(ReconcileResult::Stop);
        }

        for phase in &self.phases {
            match phase.execute(ctx, addon).await {
                Ok(ReconcileResult::Continue) => {}
                Ok(other) => {
                    debug!(phase = phase.name(), result = ?other, "Phase halted the pass");
                    return Ok(other);
                }
                Err(source) => {
                    return Err(Error::PhaseError {
                        phase: phase.name(),
                        source: Box::new(source),
                    });
                }
            }
        }

        report_ready(addon, ctx.now());
        Ok(ReconcileResult::Continue)
    }

    /// The store is deleting the Addon: drop our claims on it
    async fn release(&self, addon: &mut Addon) -> Result<ReconcileResult> {
        let ctx = self.ctx.as_ref();
        report_terminating(addon, ctx.now());
        ctx.registry.free(&addon.name_any());

        if addon.has_finalizer(FINALIZER) {
            let finalizers: Vec<String> = addon
                .finalizers()
                .iter()
                .filter(|f| f.as_str() != FINALIZER)
                .cloned()
                .collect();
            ctx.store
                .update_addon_finalizers(addon, finalizers.clone())
                .await?;
            addon.metadata.finalizers = Some(finalizers);
            info!("Removed finalizer");
        }
        Ok(ReconcileResult::Stop)
    }
}
