pub mod config;
pub mod controller;
pub mod crd;
pub mod fleet;
pub mod health;
pub mod resources;

pub use config::OperatorConfig;
pub use controller::{
    AddonOperatorContext, AddonReconciler, AddonStore, BackoffConfig, Context, Coordinator, Error,
    FINALIZER, KubeStore, MultiError, ReconcileResult, Result, error_policy, reconcile,
};
pub use crd::{Addon, AddonInstance, AddonOperator};
pub use health::{HealthState, Metrics};

use std::fmt::Debug;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::networking::v1::NetworkPolicy;
use kube::core::ObjectMeta;
use kube::runtime::Controller;
use kube::runtime::controller::Action;
use kube::runtime::reflector::{Lookup, ObjectRef};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, Resource, ResourceExt};

use crate::controller::{addon_operator_error_policy, reconcile_addon_operator};
use crate::crd::{CatalogSource, Operator, OperatorGroup, Subscription};
use crate::fleet::FleetClientFactory;

/// Addons named in the owner references of a created object
///
/// Owner references of namespaced children cannot be resolved through
/// `Controller::owns` since the Addon itself is cluster scoped.
fn owning_addons(meta: &ObjectMeta) -> Vec<ObjectRef<Addon>> {
    meta.owner_references
        .iter()
        .flatten()
        .filter(|owner| {
            owner.kind == resources::KIND && owner.api_version == resources::API_VERSION
        })
        .map(|owner| ObjectRef::new(&owner.name))
        .collect()
}

/// Log the outcome of one controller pass
fn log_result<K>(
    kind: &str,
    result: std::result::Result<
        (ObjectRef<K>, Action),
        kube::runtime::controller::Error<Error, kube::runtime::watcher::Error>,
    >,
) where
    K: Lookup,
{
    match result {
        Ok((obj, _action)) => {
            tracing::debug!("Reconciled {}: {}", kind, obj.name);
        }
        Err(e) => {
            // Watch events can arrive for objects that were just deleted
            let is_not_found = matches!(
                &e,
                kube::runtime::controller::Error::ReconcilerFailed(err, _) if err.is_not_found()
            );
            if is_not_found {
                tracing::debug!("{} no longer exists (likely deleted): {:?}", kind, e);
            } else {
                tracing::error!("{} reconciliation error: {:?}", kind, e);
            }
        }
    }
}

fn all<K>(client: &Client) -> Api<K>
where
    K: Resource + Clone + serde::de::DeserializeOwned + Debug,
    <K as Resource>::DynamicType: Default,
{
    Api::all(client.clone())
}

/// Run the Addon and AddonOperator controllers until either stream ends.
///
/// Both controllers share one [`Context`], so the AddonOperator controller
/// drives the pause flag and fleet client the Addon pipeline reads. When
/// `client_factory` is `None` the fleet syncs stay inactive.
pub async fn run_controller(
    client: Client,
    config: OperatorConfig,
    health_state: Option<Arc<HealthState>>,
    client_factory: Option<Arc<dyn FleetClientFactory>>,
) {
    tracing::info!("Starting controllers for Addon and AddonOperator resources");

    let store: Arc<dyn AddonStore> = Arc::new(KubeStore::new(client.clone()));
    let (coordinator, requeue_rx) = Coordinator::new(store.clone());

    let mut ctx = Context::new(store, Arc::new(coordinator), config);
    if let Some(ref state) = health_state {
        ctx = ctx.with_health_state(state.clone());
        state.set_ready(true).await;
    }
    let ctx = Arc::new(ctx);

    let reconciler = Arc::new(AddonReconciler::with_defaults(ctx.clone()));
    let mut operator_ctx = AddonOperatorContext::new(ctx.clone());
    if let Some(factory) = client_factory {
        operator_ctx = operator_ctx.with_client_factory(factory);
    }

    let watcher_config = WatcherConfig::default().any_semantic();
    let registry = ctx.registry.clone();

    let addon_controller = Controller::new(all::<Addon>(&client), watcher_config.clone())
        .watches(all::<Namespace>(&client), watcher_config.clone(), |o| {
            owning_addons(o.meta())
        })
        .watches(all::<AddonInstance>(&client), watcher_config.clone(), |o| {
            owning_addons(o.meta())
        })
        .watches(all::<OperatorGroup>(&client), watcher_config.clone(), |o| {
            owning_addons(o.meta())
        })
        .watches(all::<NetworkPolicy>(&client), watcher_config.clone(), |o| {
            owning_addons(o.meta())
        })
        .watches(all::<CatalogSource>(&client), watcher_config.clone(), |o| {
            owning_addons(o.meta())
        })
        .watches(all::<Subscription>(&client), watcher_config.clone(), |o| {
            owning_addons(o.meta())
        })
        .watches(
            all::<Operator>(&client),
            watcher_config.clone(),
            move |operator| {
                registry
                    .addon_for_operator(&operator.name_any())
                    .map(|name| ObjectRef::<Addon>::new(&name))
            },
        )
        .reconcile_on(requeue_rx)
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move { log_result("Addon", result) });

    let operator_controller = Controller::new(all::<AddonOperator>(&client), watcher_config)
        .run(
            reconcile_addon_operator,
            addon_operator_error_policy,
            Arc::new(operator_ctx),
        )
        .for_each(|result| async move { log_result("AddonOperator", result) });

    tokio::select! {
        _ = addon_controller => {}
        _ = operator_controller => {}
    }

    // This should never complete in normal operation
    tracing::error!("Controller stream ended unexpectedly");
}
