use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::OperatorConfig;
use crate::controller::coordinator::Coordinator;
use crate::controller::registry::OperatorResourceRegistry;
use crate::controller::store::AddonStore;
use crate::health::HealthState;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared context for the controllers
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn AddonStore>,
    pub coordinator: Arc<Coordinator>,
    pub registry: Arc<OperatorResourceRegistry>,
    pub clock: Arc<dyn Clock>,
    pub config: OperatorConfig,
    /// Health state for metrics (optional)
    pub health_state: Option<Arc<HealthState>>,
}

impl Context {
    pub fn new(
        store: Arc<dyn AddonStore>,
        coordinator: Arc<Coordinator>,
        config: OperatorConfig,
    ) -> Self {
        Self {
            store,
            coordinator,
            registry: Arc::new(OperatorResourceRegistry::new()),
            clock: Arc::new(SystemClock),
            config,
            health_state: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_registry(mut self, registry: Arc<OperatorResourceRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_health_state(mut self, health_state: Arc<HealthState>) -> Self {
        self.health_state = Some(health_state);
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
