//! Controller entry points for Addon resources
//!
//! Adapts the [`AddonReconciler`] pipeline to the kube-runtime controller:
//! records metrics, converts the pass result into an [`Action`] and applies
//! the backoff policy to failed passes.

use std::sync::Arc;
use std::time::Instant;

use kube::ResourceExt;
use kube::runtime::controller::Action;
use tracing::{error, info, instrument, warn};

use crate::controller::error::{BackoffConfig, Error, Result};
use crate::controller::pipeline::AddonReconciler;
use crate::crd::Addon;

/// Default backoff configuration for error handling
fn default_backoff() -> BackoffConfig {
    BackoffConfig::default()
}

/// Main reconciliation function
#[instrument(skip(addon, reconciler), fields(name = %addon.name_any()))]
pub async fn reconcile(addon: Arc<Addon>, reconciler: Arc<AddonReconciler>) -> Result<Action> {
    let ctx = reconciler.context();
    let name = addon.name_any();
    let started = Instant::now();

    info!("Reconciling Addon");
    let outcome = reconciler.reconcile(&addon).await;

    if let Some(health) = ctx.health_state.as_ref() {
        let metrics = &health.metrics;
        metrics.record_reconcile(&name, started.elapsed().as_secs_f64());
        match &outcome {
            Ok(_) => health.touch_last_reconcile(),
            Err(_) => metrics.record_error(&name),
        }
    }

    match outcome {
        Ok(result) => {
            reconciler.retries().reset(&name);
            info!(?result, "Reconciliation completed");
            Ok(result.into_action(ctx.config.resync_interval))
        }
        Err(errors) => {
            error!("Reconciliation failed: {}", errors);
            Err(Error::from(errors))
        }
    }
}

/// Error policy for the controller with exponential backoff
pub fn error_policy(addon: Arc<Addon>, error: &Error, reconciler: Arc<AddonReconciler>) -> Action {
    let name = addon.name_any();
    let backoff = default_backoff();

    let attempt = reconciler.retries().record_failure(&name);
    let delay = backoff.delay_for_error(error, attempt);

    if error.is_retryable() {
        warn!(
            "Retryable error for {}: {}, requeuing in {:?}",
            name, error, delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {}, requeuing in {:?} for manual intervention",
            name, error, delay
        );
    }

    Action::requeue(delay)
}
