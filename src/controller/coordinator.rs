//! Operator-wide state shared by every Addon reconcile
//!
//! The global pause flag and the fleet client each sit behind their own lock.
//! Changing either one forces a requeue of every Addon so no reconcile keeps
//! acting on the old value. A requeue that fails to list the Addons stays
//! pending until [`Coordinator::retry_pending_requeue`] gets it through.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use kube::ResourceExt;
use kube::runtime::reflector::ObjectRef;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{info, warn};

use crate::controller::error::Result;
use crate::controller::store::AddonStore;
use crate::crd::Addon;
use crate::fleet::FleetClient;

pub struct Coordinator {
    paused: RwLock<bool>,
    fleet_client: RwLock<Option<Arc<dyn FleetClient>>>,
    store: Arc<dyn AddonStore>,
    requeue_tx: UnboundedSender<ObjectRef<Addon>>,
    requeue_pending: AtomicBool,
}

impl Coordinator {
    /// Create the coordinator and the requeue stream the Addon controller consumes
    pub fn new(store: Arc<dyn AddonStore>) -> (Self, UnboundedReceiver<ObjectRef<Addon>>) {
        let (requeue_tx, requeue_rx) = mpsc::unbounded();
        let coordinator = Self {
            paused: RwLock::new(false),
            fleet_client: RwLock::new(None),
            store,
            requeue_tx,
            requeue_pending: AtomicBool::new(false),
        };
        (coordinator, requeue_rx)
    }

    /// Pause every Addon reconcile
    ///
    /// Waits for in-flight reconciles to release their pause guard first.
    pub async fn enable_global_pause(&self) -> Result<()> {
        let mut paused = self.paused.write().await;
        *paused = true;
        info!("Global pause enabled");
        self.requeue_all().await
    }

    pub async fn disable_global_pause(&self) -> Result<()> {
        let mut paused = self.paused.write().await;
        *paused = false;
        info!("Global pause disabled");
        self.requeue_all().await
    }

    pub async fn is_paused(&self) -> bool {
        *self.paused.read().await
    }

    /// Guard keeping the pause flag stable for the duration of a reconcile
    pub async fn read_pause(&self) -> RwLockReadGuard<'_, bool> {
        self.paused.read().await
    }

    /// Install or replace the fleet client
    ///
    /// Only the first injection requeues every Addon; later swaps are picked up
    /// by the next regular pass.
    pub async fn inject_fleet_client(&self, client: Arc<dyn FleetClient>) -> Result<()> {
        let first = {
            let mut guard = self.fleet_client.write().await;
            let first = guard.is_none();
            *guard = Some(client);
            first
        };

        if first {
            info!("Fleet client injected");
            self.requeue_all().await?;
        }
        Ok(())
    }

    pub async fn fleet_client(&self) -> Option<Arc<dyn FleetClient>> {
        self.fleet_client.read().await.clone()
    }

    pub async fn has_fleet_client(&self) -> bool {
        self.fleet_client.read().await.is_some()
    }

    /// Whether an earlier requeue of every Addon has not gone through yet
    pub fn requeue_pending(&self) -> bool {
        self.requeue_pending.load(Ordering::SeqCst)
    }

    /// Repeat a requeue of every Addon that failed earlier; no-op otherwise
    pub async fn retry_pending_requeue(&self) -> Result<()> {
        if !self.requeue_pending() {
            return Ok(());
        }
        info!("Retrying pending requeue of all addons");
        self.requeue_all().await
    }

    async fn requeue_all(&self) -> Result<()> {
        self.requeue_pending.store(true, Ordering::SeqCst);
        let addons = self.store.list_addons().await?;
        self.requeue_pending.store(false, Ordering::SeqCst);

        for addon in &addons {
            if let Err(e) = self.requeue_tx.unbounded_send(ObjectRef::from_obj(addon)) {
                warn!("Cannot requeue addon {}: {}", addon.name_any(), e);
            }
        }
        Ok(())
    }
}
