//! Reconciler for the AddonOperator singleton
//!
//! Mirrors the operator-wide settings into the [`Coordinator`]: the global
//! pause switch and, once OCM settings are present, the fleet client.
//!
//! [`Coordinator`]: crate::controller::coordinator::Coordinator

use std::sync::Arc;

use kube::ResourceExt;
use kube::runtime::controller::Action;
use tracing::{error, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::error::{BackoffConfig, Error, Result, RetryTracker};
use crate::controller::status::{
    ConditionBuilder, condition_status, condition_types, format_time, reasons,
};
use crate::crd::{AddonOperator, AddonOperatorStatus};
use crate::fleet::FleetClientFactory;

pub struct AddonOperatorContext {
    pub ctx: Arc<Context>,
    /// Builds the fleet client from the OCM settings; without one no client is injected
    pub client_factory: Option<Arc<dyn FleetClientFactory>>,
    pub retries: RetryTracker,
}

impl AddonOperatorContext {
    pub fn new(ctx: Arc<Context>) -> Self {
        Self {
            ctx,
            client_factory: None,
            retries: RetryTracker::new(),
        }
    }

    pub fn with_client_factory(mut self, factory: Arc<dyn FleetClientFactory>) -> Self {
        self.client_factory = Some(factory);
        self
    }
}

#[instrument(skip(operator, octx), fields(name = %operator.name_any()))]
pub async fn reconcile_addon_operator(
    operator: Arc<AddonOperator>,
    octx: Arc<AddonOperatorContext>,
) -> Result<Action> {
    let ctx = octx.ctx.as_ref();
    let paused = operator.spec.paused;

    if paused != ctx.coordinator.is_paused().await {
        if paused {
            ctx.coordinator.enable_global_pause().await?;
        } else {
            ctx.coordinator.disable_global_pause().await?;
        }
    }
    if let Some(health) = ctx.health_state.as_ref() {
        health.metrics.set_global_pause(paused);
    }

    if let (Some(ocm), Some(factory)) = (operator.spec.ocm.as_ref(), octx.client_factory.as_ref())
        && !ctx.coordinator.has_fleet_client().await
    {
        info!(endpoint = %ocm.endpoint, "Building fleet client");
        let client = factory.build(ocm).await?;
        ctx.coordinator.inject_fleet_client(client).await?;
    }
    ctx.coordinator.retry_pending_requeue().await?;

    let now = ctx.now();
    let generation = operator.metadata.generation;
    let existing = operator
        .status
        .as_ref()
        .map(|s| s.conditions.clone())
        .unwrap_or_default();
    let builder = ConditionBuilder::from_existing(existing, generation, now).set_condition(
        condition_types::AVAILABLE,
        condition_status::TRUE,
        reasons::ADDON_OPERATOR_READY,
        "Addon operator is ready",
    );
    let conditions = if paused {
        builder.set_condition(
            condition_types::PAUSED,
            condition_status::TRUE,
            reasons::ADDON_OPERATOR_PAUSED,
            "Addon operator is paused",
        )
    } else {
        builder.remove_condition(condition_types::PAUSED)
    }
    .build();

    let mut updated = (*operator).clone();
    updated.status = Some(AddonOperatorStatus {
        conditions,
        last_heartbeat_time: Some(format_time(now)),
        observed_generation: generation,
    });
    ctx.store.update_addon_operator_status(&updated).await?;
    octx.retries.reset(&operator.name_any());

    Ok(Action::requeue(ctx.config.resync_interval))
}

pub fn addon_operator_error_policy(
    operator: Arc<AddonOperator>,
    error: &Error,
    octx: Arc<AddonOperatorContext>,
) -> Action {
    let attempt = octx.retries.record_failure(&operator.name_any());
    let delay = BackoffConfig::default().delay_for_error(error, attempt);
    if error.is_retryable() {
        warn!(
            "Retryable error for AddonOperator {}: {}, requeuing in {:?}",
            operator.name_any(),
            error,
            delay
        );
    } else {
        error!(
            "Non-retryable error for AddonOperator {}: {}, requeuing in {:?}",
            operator.name_any(),
            error,
            delay
        );
    }
    Action::requeue(delay)
}
