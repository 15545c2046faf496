//! Test fixtures for Addon reconciles
//!
//! [`FakeStore`] keeps every object in memory and can be told to fail the
//! calls the pipeline depends on. [`Harness`] wires it into a [`Context`]
//! with a [`FixedClock`] so timeouts can be exercised without waiting.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! let harness = Harness::new();
//! let addon = AddonBuilder::new("my-addon").with_finalizer().build();
//! harness.store.seed_installed_csv(&addon, "my-addon.v1.0.0", Some(true));
//! let result = harness.reconciler().reconcile(&addon).await;
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::channel::mpsc::UnboundedReceiver;
use k8s_openapi::api::core::v1::{ConfigMap, Namespace};
use k8s_openapi::api::networking::v1::NetworkPolicy;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::ResourceExt;
use kube::core::ObjectMeta;
use kube::runtime::reflector::ObjectRef;

use addon_operator::config::OperatorConfig;
use addon_operator::controller::status::format_time;
use addon_operator::controller::{
    AddonReconciler, AddonStore, Clock, Context, Coordinator, Error, FINALIZER, MultiError,
    ReconcileResult, Result,
};
use addon_operator::crd::{
    ADDON_INSTANCE_NAME, AdditionalCatalogSource, Addon, AddonInstallOLMCommon, AddonInstallSpec,
    AddonInstallType, AddonInstance, AddonInstanceStatus, AddonOperator, AddonSpec, AddonStatus,
    AddonUpgradePolicy, CSV_KIND, CatalogSource, ComponentCondition, Components, Condition,
    DELETE_ANNOTATION, DELETE_TIMEOUT_ANNOTATION, InstallPlan, InstallPlanSpec, InstallPlanStatus,
    ObjectReference, Operator, OperatorGroup, OperatorSpec, OperatorStatus, RichReference,
    Subscription, SubscriptionStatus, operator_key,
};
use addon_operator::fleet::{
    AddonStatusReport, FleetClient, FleetError, UpgradePolicyPatch, UpgradePolicyState,
};
use addon_operator::resources::olm::generate_subscription;

/// Start of every test clock
pub fn epoch() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

// =============================================================================
// Clock
// =============================================================================

/// Clock that only moves when told to
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

// =============================================================================
// Addon builder
// =============================================================================

/// Install settings that pass validation
pub fn complete_install(addon_name: &str) -> AddonInstallOLMCommon {
    AddonInstallOLMCommon {
        namespace: format!("addon-{}", addon_name),
        package_name: format!("{}-pkg", addon_name),
        channel: "stable".to_string(),
        catalog_source_image: format!("quay.io/osd-addons/{}-index:latest", addon_name),
        ..Default::default()
    }
}

pub struct AddonBuilder {
    addon: Addon,
}

impl AddonBuilder {
    /// OwnNamespace addon with complete install settings and version 1.0.0
    pub fn new(name: &str) -> Self {
        let spec = AddonSpec {
            display_name: name.to_string(),
            version: "1.0.0".to_string(),
            install: AddonInstallSpec {
                type_: AddonInstallType::OwnNamespace,
                olm_own_namespace: Some(complete_install(name)),
                olm_all_namespaces: None,
            },
            ..Default::default()
        };
        let mut addon = Addon::new(name, spec);
        addon.metadata.uid = Some(format!("{}-uid", name));
        addon.metadata.generation = Some(1);
        Self { addon }
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.addon.spec.version = version.to_string();
        self
    }

    pub fn with_observed_version(mut self, version: &str) -> Self {
        self.addon.status_mut().observed_version = version.to_string();
        self
    }

    pub fn with_finalizer(mut self) -> Self {
        self.addon
            .metadata
            .finalizers
            .get_or_insert_with(Vec::new)
            .push(FINALIZER.to_string());
        self
    }

    pub fn paused(mut self) -> Self {
        self.addon.spec.paused = true;
        self
    }

    pub fn marked_for_deletion(mut self) -> Self {
        self.annotations().insert(DELETE_ANNOTATION.to_string(), String::new());
        self
    }

    pub fn with_delete_timeout(mut self, value: &str) -> Self {
        self.annotations()
            .insert(DELETE_TIMEOUT_ANNOTATION.to_string(), value.to_string());
        self
    }

    pub fn delete_ack_required(mut self) -> Self {
        self.addon.spec.delete_ack_required = true;
        self
    }

    pub fn install_ack_required(mut self) -> Self {
        self.addon.spec.install_ack_required = true;
        self
    }

    pub fn being_deleted(mut self) -> Self {
        self.addon.metadata.deletion_timestamp = Some(Time(epoch()));
        self
    }

    pub fn with_upgrade_policy(mut self, id: &str) -> Self {
        self.addon.spec.upgrade_policy = Some(AddonUpgradePolicy { id: id.to_string() });
        self
    }

    pub fn with_correlation_id(mut self, id: &str) -> Self {
        self.addon.spec.correlation_id = id.to_string();
        self
    }

    pub fn with_additional_catalog(mut self, name: &str, image: &str) -> Self {
        if let Some(install) = self.addon.spec.install.olm_own_namespace.as_mut() {
            install.additional_catalog_sources.push(AdditionalCatalogSource {
                name: name.to_string(),
                image: image.to_string(),
            });
        }
        self
    }

    pub fn without_install(mut self) -> Self {
        self.addon.spec.install.olm_own_namespace = None;
        self
    }

    pub fn with_status(mut self, status: AddonStatus) -> Self {
        self.addon.status = Some(status);
        self
    }

    pub fn with_condition(mut self, type_: &str, status: &str, reason: &str, message: &str) -> Self {
        self.addon.status_mut().conditions.push(Condition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: reason.to_string(),
            message: message.to_string(),
            last_transition_time: format_time(epoch()),
            observed_generation: Some(1),
        });
        self
    }

    pub fn build(self) -> Addon {
        self.addon
    }

    fn annotations(&mut self) -> &mut BTreeMap<String, String> {
        self.addon.metadata.annotations.get_or_insert_with(BTreeMap::new)
    }
}

/// Install settings of a fixture addon
pub fn install_of(addon: &Addon) -> AddonInstallOLMCommon {
    addon.install_config().cloned().unwrap()
}

// =============================================================================
// In-memory store
// =============================================================================

type Key = (String, String);

fn key_of(meta: &ObjectMeta) -> Key {
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn injected(what: &str) -> Error {
    Error::TransientError(format!("injected {} failure", what))
}

/// In-memory [`AddonStore`]
#[derive(Default)]
pub struct FakeStore {
    pub addons: Mutex<Vec<Addon>>,
    pub namespaces: Mutex<BTreeMap<String, Namespace>>,
    pub addon_instances: Mutex<BTreeMap<Key, AddonInstance>>,
    pub operator_groups: Mutex<BTreeMap<Key, OperatorGroup>>,
    pub catalog_sources: Mutex<BTreeMap<Key, CatalogSource>>,
    pub subscriptions: Mutex<BTreeMap<Key, Subscription>>,
    pub network_policies: Mutex<BTreeMap<Key, NetworkPolicy>>,
    pub install_plans: Mutex<BTreeMap<Key, InstallPlan>>,
    pub operators: Mutex<BTreeMap<String, Operator>>,
    pub config_maps: Mutex<Vec<ConfigMap>>,
    pub addon_operators: Mutex<BTreeMap<String, AddonOperator>>,

    /// Every status successfully persisted, oldest first
    pub persisted: Mutex<Vec<Addon>>,
    /// Finalizer lists written through `update_addon_finalizers`
    pub finalizer_updates: Mutex<Vec<Vec<String>>>,
    /// Calls to `update_addon_status`, failed ones included
    pub status_update_calls: AtomicUsize,
    /// Calls to `update_addon_instance`
    pub addon_instance_updates: AtomicUsize,

    pub fail_status_update: AtomicBool,
    pub fail_list_addons: AtomicBool,
    pub fail_get_subscription: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_addons(addons: Vec<Addon>) -> Self {
        let store = Self::default();
        *store.addons.lock().unwrap() = addons;
        store
    }

    pub fn last_persisted(&self) -> Option<Addon> {
        self.persisted.lock().unwrap().last().cloned()
    }

    pub fn persisted_count(&self) -> usize {
        self.persisted.lock().unwrap().len()
    }

    pub fn addon_instance(&self, namespace: &str) -> Option<AddonInstance> {
        self.addon_instances
            .lock()
            .unwrap()
            .get(&key(namespace, ADDON_INSTANCE_NAME))
            .cloned()
    }

    pub fn subscription(&self, namespace: &str, name: &str) -> Option<Subscription> {
        self.subscriptions
            .lock()
            .unwrap()
            .get(&key(namespace, name))
            .cloned()
    }

    /// Store an AddonInstance whose workload reports the given condition
    pub fn seed_addon_instance_condition(&self, namespace: &str, type_: &str, status: &str) {
        let mut instances = self.addon_instances.lock().unwrap();
        let instance = instances
            .entry(key(namespace, ADDON_INSTANCE_NAME))
            .or_insert_with(|| {
                let mut instance = AddonInstance::new(ADDON_INSTANCE_NAME, Default::default());
                instance.metadata.namespace = Some(namespace.to_string());
                instance
            });
        let status_ref = instance.status.get_or_insert_with(AddonInstanceStatus::default);
        status_ref.conditions.retain(|c| c.type_ != type_);
        status_ref.conditions.push(Condition {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: "Reported".to_string(),
            message: String::new(),
            last_transition_time: format_time(epoch()),
            observed_generation: None,
        });
    }

    /// Store the Subscription OLM would have linked to `csv_name`
    pub fn seed_linked_subscription(&self, addon: &Addon, csv_name: &str) {
        let install = install_of(addon);
        let mut subscription = generate_subscription(addon, &install);
        subscription.status = Some(SubscriptionStatus {
            current_csv: Some(csv_name.to_string()),
            ..Default::default()
        });
        let k = key_of(&subscription.metadata);
        self.subscriptions.lock().unwrap().insert(k, subscription);
    }

    /// Store the Operator aggregate listing `csv_name`
    ///
    /// `succeeded` maps to the status of the CSV `Succeeded` condition; `None`
    /// leaves it out.
    pub fn seed_operator_csv(&self, addon: &Addon, csv_name: &str, succeeded: Option<bool>) {
        let install = install_of(addon);
        let op_key = operator_key(&install.package_name, &install.namespace);
        let conditions = match succeeded {
            Some(ok) => vec![ComponentCondition {
                type_: "Succeeded".to_string(),
                status: if ok { "True" } else { "False" }.to_string(),
                reason: None,
                message: None,
            }],
            None => Vec::new(),
        };

        let mut operator = Operator::new(&op_key, OperatorSpec {});
        operator.status = Some(OperatorStatus {
            components: Some(Components {
                refs: vec![RichReference {
                    kind: Some(CSV_KIND.to_string()),
                    name: Some(csv_name.to_string()),
                    namespace: Some(install.namespace.clone()),
                    api_version: Some("operators.coreos.com/v1alpha1".to_string()),
                    conditions,
                }],
            }),
        });
        self.operators.lock().unwrap().insert(op_key, operator);
    }

    /// Subscription and Operator for an installed CSV
    pub fn seed_installed_csv(&self, addon: &Addon, csv_name: &str, succeeded: Option<bool>) {
        self.seed_linked_subscription(addon, csv_name);
        self.seed_operator_csv(addon, csv_name, succeeded);
    }

    pub fn remove_operator(&self, addon: &Addon) {
        let install = install_of(addon);
        self.operators
            .lock()
            .unwrap()
            .remove(&operator_key(&install.package_name, &install.namespace));
    }

    /// Put the Subscription on manual approval with a plan in `phase`
    pub fn seed_manual_install_plan(&self, addon: &Addon, plan_name: &str, phase: &str) {
        let install = install_of(addon);
        let mut subscriptions = self.subscriptions.lock().unwrap();
        for subscription in subscriptions.values_mut() {
            if subscription.metadata.namespace.as_deref() != Some(install.namespace.as_str()) {
                continue;
            }
            subscription.spec.install_plan_approval =
                Some(addon_operator::crd::Approval::Manual);
            subscription
                .status
                .get_or_insert_with(SubscriptionStatus::default)
                .install_plan_ref = Some(ObjectReference {
                name: Some(plan_name.to_string()),
                namespace: Some(install.namespace.clone()),
            });
        }

        let mut plan = InstallPlan::new(plan_name, InstallPlanSpec::default());
        plan.metadata.namespace = Some(install.namespace.clone());
        plan.status = Some(InstallPlanStatus {
            phase: Some(phase.to_string()),
        });
        self.install_plans
            .lock()
            .unwrap()
            .insert(key(&install.namespace, plan_name), plan);
    }

    /// A delete-confirmation ConfigMap as OCM would create it
    pub fn seed_delete_config_map(&self, addon: &Addon) {
        let install = install_of(addon);
        let mut labels = BTreeMap::new();
        labels.insert(addon.delete_config_map_label(), String::new());
        self.config_maps.lock().unwrap().push(ConfigMap {
            metadata: ObjectMeta {
                name: Some(format!("{}-delete", addon.name_any())),
                namespace: Some(install.namespace),
                labels: Some(labels),
                ..Default::default()
            },
            ..Default::default()
        });
    }
}

fn create_in<T: Clone>(map: &Mutex<BTreeMap<Key, T>>, meta: &ObjectMeta, obj: &T) -> Result<()> {
    let mut map = map.lock().unwrap();
    let k = key_of(meta);
    if map.contains_key(&k) {
        return Err(Error::TransientError(format!("{}/{} already exists", k.0, k.1)));
    }
    map.insert(k, obj.clone());
    Ok(())
}

fn update_in<T: Clone>(map: &Mutex<BTreeMap<Key, T>>, meta: &ObjectMeta, obj: &T) -> Result<()> {
    let mut map = map.lock().unwrap();
    let k = key_of(meta);
    match map.get_mut(&k) {
        Some(slot) => {
            *slot = obj.clone();
            Ok(())
        }
        None => Err(Error::NotFound(format!("{}/{}", k.0, k.1))),
    }
}

fn get_in<T: Clone>(map: &Mutex<BTreeMap<Key, T>>, namespace: &str, name: &str) -> Option<T> {
    map.lock().unwrap().get(&key(namespace, name)).cloned()
}

#[async_trait]
impl AddonStore for FakeStore {
    async fn list_addons(&self) -> Result<Vec<Addon>> {
        if self.fail_list_addons.load(Ordering::SeqCst) {
            return Err(injected("list addons"));
        }
        Ok(self.addons.lock().unwrap().clone())
    }

    async fn update_addon_finalizers(&self, addon: &Addon, finalizers: Vec<String>) -> Result<()> {
        self.finalizer_updates.lock().unwrap().push(finalizers.clone());
        let mut addons = self.addons.lock().unwrap();
        if let Some(stored) = addons.iter_mut().find(|a| a.name_any() == addon.name_any()) {
            stored.metadata.finalizers = Some(finalizers);
        }
        Ok(())
    }

    async fn update_addon_status(&self, addon: &Addon) -> Result<()> {
        self.status_update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_status_update.load(Ordering::SeqCst) {
            return Err(injected("status update"));
        }
        self.persisted.lock().unwrap().push(addon.clone());
        Ok(())
    }

    async fn get_namespace(&self, name: &str) -> Result<Option<Namespace>> {
        Ok(self.namespaces.lock().unwrap().get(name).cloned())
    }

    async fn create_namespace(&self, namespace: &Namespace) -> Result<()> {
        self.namespaces
            .lock()
            .unwrap()
            .insert(namespace.name_any(), namespace.clone());
        Ok(())
    }

    async fn get_addon_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AddonInstance>> {
        Ok(get_in(&self.addon_instances, namespace, name))
    }

    async fn create_addon_instance(&self, instance: &AddonInstance) -> Result<()> {
        create_in(&self.addon_instances, &instance.metadata, instance)
    }

    async fn update_addon_instance(&self, instance: &AddonInstance) -> Result<()> {
        self.addon_instance_updates.fetch_add(1, Ordering::SeqCst);
        update_in(&self.addon_instances, &instance.metadata, instance)
    }

    async fn get_operator_group(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<OperatorGroup>> {
        Ok(get_in(&self.operator_groups, namespace, name))
    }

    async fn create_operator_group(&self, group: &OperatorGroup) -> Result<()> {
        create_in(&self.operator_groups, &group.metadata, group)
    }

    async fn update_operator_group(&self, group: &OperatorGroup) -> Result<()> {
        update_in(&self.operator_groups, &group.metadata, group)
    }

    async fn get_catalog_source(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<CatalogSource>> {
        Ok(get_in(&self.catalog_sources, namespace, name))
    }

    async fn create_catalog_source(&self, catalog: &CatalogSource) -> Result<()> {
        create_in(&self.catalog_sources, &catalog.metadata, catalog)
    }

    async fn update_catalog_source(&self, catalog: &CatalogSource) -> Result<()> {
        update_in(&self.catalog_sources, &catalog.metadata, catalog)
    }

    async fn get_subscription(&self, namespace: &str, name: &str) -> Result<Option<Subscription>> {
        if self.fail_get_subscription.load(Ordering::SeqCst) {
            return Err(injected("get subscription"));
        }
        Ok(get_in(&self.subscriptions, namespace, name))
    }

    async fn create_subscription(&self, subscription: &Subscription) -> Result<()> {
        create_in(&self.subscriptions, &subscription.metadata, subscription)
    }

    /// Spec-only update; the status written by OLM survives
    async fn update_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let k = key_of(&subscription.metadata);
        match subscriptions.get_mut(&k) {
            Some(stored) => {
                stored.spec = subscription.spec.clone();
                Ok(())
            }
            None => Err(Error::NotFound(format!("{}/{}", k.0, k.1))),
        }
    }

    async fn get_network_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<NetworkPolicy>> {
        Ok(get_in(&self.network_policies, namespace, name))
    }

    async fn create_network_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        create_in(&self.network_policies, &policy.metadata, policy)
    }

    async fn update_network_policy(&self, policy: &NetworkPolicy) -> Result<()> {
        update_in(&self.network_policies, &policy.metadata, policy)
    }

    async fn get_install_plan(&self, namespace: &str, name: &str) -> Result<Option<InstallPlan>> {
        Ok(get_in(&self.install_plans, namespace, name))
    }

    async fn get_operator(&self, name: &str) -> Result<Option<Operator>> {
        Ok(self.operators.lock().unwrap().get(name).cloned())
    }

    async fn list_config_maps_uncached(
        &self,
        namespace: &str,
        label_key: &str,
    ) -> Result<Vec<ConfigMap>> {
        Ok(self
            .config_maps
            .lock()
            .unwrap()
            .iter()
            .filter(|cm| cm.metadata.namespace.as_deref() == Some(namespace))
            .filter(|cm| cm.labels().contains_key(label_key))
            .cloned()
            .collect())
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        self.config_maps.lock().unwrap().push(config_map.clone());
        Ok(())
    }

    async fn get_addon_operator(&self, name: &str) -> Result<Option<AddonOperator>> {
        Ok(self.addon_operators.lock().unwrap().get(name).cloned())
    }

    async fn update_addon_operator_status(&self, operator: &AddonOperator) -> Result<()> {
        self.addon_operators
            .lock()
            .unwrap()
            .insert(operator.name_any(), operator.clone());
        Ok(())
    }
}

// =============================================================================
// Fleet client
// =============================================================================

/// In-memory fleet API recording every call
#[derive(Default)]
pub struct FakeFleetClient {
    pub policies: Mutex<BTreeMap<String, UpgradePolicyState>>,
    pub statuses: Mutex<BTreeMap<String, AddonStatusReport>>,
    pub calls: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl FakeFleetClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(self, state: UpgradePolicyState) -> Self {
        self.policies.lock().unwrap().insert(state.id.clone(), state);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &str) -> std::result::Result<(), FleetError> {
        self.calls.lock().unwrap().push(call.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(FleetError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FleetClient for FakeFleetClient {
    async fn get_upgrade_policy(
        &self,
        id: &str,
    ) -> std::result::Result<UpgradePolicyState, FleetError> {
        self.record("get_upgrade_policy")?;
        self.policies
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| FleetError::NotFound(format!("upgrade policy {}", id)))
    }

    async fn patch_upgrade_policy(
        &self,
        patch: UpgradePolicyPatch,
    ) -> std::result::Result<(), FleetError> {
        self.record("patch_upgrade_policy")?;
        self.policies.lock().unwrap().insert(
            patch.id.clone(),
            UpgradePolicyState {
                id: patch.id,
                value: patch.value,
                description: patch.description,
            },
        );
        Ok(())
    }

    async fn get_addon_status(
        &self,
        addon_id: &str,
    ) -> std::result::Result<Option<AddonStatusReport>, FleetError> {
        self.record("get_addon_status")?;
        Ok(self.statuses.lock().unwrap().get(addon_id).cloned())
    }

    async fn post_addon_status(
        &self,
        report: AddonStatusReport,
    ) -> std::result::Result<(), FleetError> {
        self.record("post_addon_status")?;
        self.statuses
            .lock()
            .unwrap()
            .insert(report.addon_id.clone(), report);
        Ok(())
    }

    async fn patch_addon_status(
        &self,
        report: AddonStatusReport,
    ) -> std::result::Result<(), FleetError> {
        self.record("patch_addon_status")?;
        self.statuses
            .lock()
            .unwrap()
            .insert(report.addon_id.clone(), report);
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub type PassResult = std::result::Result<ReconcileResult, MultiError>;

/// Context wired to a [`FakeStore`] and a [`FixedClock`]
pub struct Harness {
    pub store: Arc<FakeStore>,
    pub clock: Arc<FixedClock>,
    pub ctx: Arc<Context>,
    pub requeue_rx: UnboundedReceiver<ObjectRef<Addon>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(FakeStore::new(), OperatorConfig::default())
    }

    pub fn with_config(config: OperatorConfig) -> Self {
        Self::with_store(FakeStore::new(), config)
    }

    pub fn with_store(store: FakeStore, config: OperatorConfig) -> Self {
        let store = Arc::new(store);
        let clock = Arc::new(FixedClock::new(epoch()));
        let dyn_store: Arc<dyn AddonStore> = store.clone();
        let (coordinator, requeue_rx) = Coordinator::new(dyn_store.clone());
        let ctx = Context::new(dyn_store, Arc::new(coordinator), config).with_clock(clock.clone());
        Self {
            store,
            clock,
            ctx: Arc::new(ctx),
            requeue_rx,
        }
    }

    /// Reconciler with the standard phases, handlers and syncs
    pub fn reconciler(&self) -> AddonReconciler {
        AddonReconciler::with_defaults(self.ctx.clone())
    }

    /// Run one pass and return its outcome with the status it persisted
    ///
    /// Falls back to the input when nothing was persisted, so passes can be
    /// chained.
    pub async fn pass(&self, addon: &Addon) -> (PassResult, Addon) {
        let before = self.store.persisted_count();
        let result = self.reconciler().reconcile(addon).await;
        let after = if self.store.persisted_count() > before {
            self.store.last_persisted().unwrap()
        } else {
            addon.clone()
        };
        (result, after)
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.ctx.coordinator
    }

    /// Names of the Addons requeued so far
    pub fn drain_requeues(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        while let Ok(obj) = self.requeue_rx.try_recv() {
            names.push(obj.name);
        }
        names
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
