//! Deletion handshake between the operator and the addon workload
//!
//! Once an Addon carries the delete annotation the operator asks the workload
//! to prepare for removal and waits for an acknowledgement. The wait is
//! bounded: after the timeout elapses the Addon is flagged with
//! `DeleteTimeout` and left for the caller to decide.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use kube::ResourceExt;
use tracing::{debug, info, instrument, warn};

use crate::controller::context::Context;
use crate::controller::duration::parse_go_duration;
use crate::controller::error::Result;
use crate::controller::result::ReconcileResult;
use crate::controller::status::{
    condition_types, find_condition, is_condition_true, parse_time, reasons,
    remove_addon_condition, set_addon_condition,
};
use crate::crd::{ADDON_INSTANCE_NAME, Addon, CSV_KIND, operator_key};
use crate::resources::common::owned_metadata;

/// How long to wait for an ack when the Addon does not override it
pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// One way of telling the addon workload it is about to be removed
#[async_trait]
pub trait DeletionHandler: Send + Sync {
    fn name(&self) -> &'static str;

    async fn notify_addon(&self, ctx: &Context, addon: &Addon) -> Result<()>;

    async fn ack_received_from_addon(&self, ctx: &Context, addon: &Addon) -> Result<bool>;
}

pub struct DeletionHandshake {
    handlers: Vec<Box<dyn DeletionHandler>>,
}

impl DeletionHandshake {
    pub fn new(handlers: Vec<Box<dyn DeletionHandler>>) -> Self {
        Self { handlers }
    }

    /// AddonInstance signalling first, then the delete ConfigMap
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Box::new(AddonInstanceDeletionHandler),
            Box::new(LegacyDeletionHandler),
        ])
    }

    /// Advance the handshake for `addon`, recording progress in its conditions
    #[instrument(skip(self, ctx, addon), fields(addon = %addon.name_any()))]
    pub async fn run(&self, ctx: &Context, addon: &mut Addon) -> Result<ReconcileResult> {
        if !addon.is_marked_for_deletion() {
            return Ok(ReconcileResult::Continue);
        }
        if is_condition_true(addon.conditions(), condition_types::READY_TO_BE_DELETED) {
            return Ok(ReconcileResult::Continue);
        }

        let now = ctx.now();
        if !addon.spec.delete_ack_required {
            report_ready_to_be_deleted(addon, ctx);
            return Ok(ReconcileResult::Continue);
        }

        set_addon_condition(
            addon,
            condition_types::READY_TO_BE_DELETED,
            false,
            reasons::NOT_READY_TO_BE_DELETED,
            "Waiting for the addon to acknowledge deletion",
            now,
        );

        for handler in &self.handlers {
            handler.notify_addon(ctx, addon).await?;
            if handler.ack_received_from_addon(ctx, addon).await? {
                info!(handler = handler.name(), "Deletion acknowledged");
                report_ready_to_be_deleted(addon, ctx);
                return Ok(ReconcileResult::Continue);
            }
        }

        let timeout = delete_timeout(addon);
        let since = find_condition(addon.conditions(), condition_types::READY_TO_BE_DELETED)
            .and_then(|c| parse_time(&c.last_transition_time))
            .unwrap_or(now);
        let elapsed = (now - since).to_std().unwrap_or(Duration::ZERO);

        if elapsed > timeout {
            warn!(?timeout, "Addon did not acknowledge deletion in time");
            set_addon_condition(
                addon,
                condition_types::DELETE_TIMEOUT,
                true,
                reasons::DELETE_TIMED_OUT,
                &format!("Addon did not acknowledge deletion within {:?}", timeout),
                now,
            );
            return Ok(ReconcileResult::Continue);
        }

        let remaining = timeout - elapsed;
        debug!(?remaining, "Waiting for deletion ack");
        Ok(ReconcileResult::RequeueAfter(remaining))
    }
}

fn report_ready_to_be_deleted(addon: &mut Addon, ctx: &Context) {
    set_addon_condition(
        addon,
        condition_types::READY_TO_BE_DELETED,
        true,
        reasons::READY_TO_BE_DELETED,
        "Addon is ready to be deleted",
        ctx.now(),
    );
    remove_addon_condition(addon, condition_types::DELETE_TIMEOUT);
}

/// Timeout override from the annotation; unparsable values fall back to the default
pub fn delete_timeout(addon: &Addon) -> Duration {
    match addon.delete_timeout_override() {
        Some(raw) => parse_go_duration(raw).unwrap_or_else(|| {
            debug!(value = raw, "Ignoring invalid delete timeout override");
            DEFAULT_DELETE_TIMEOUT
        }),
        None => DEFAULT_DELETE_TIMEOUT,
    }
}

/// Flags the AddonInstance with `markedForDeletion` and waits for the
/// workload to report `ReadyToBeDeleted`
pub struct AddonInstanceDeletionHandler;

#[async_trait]
impl DeletionHandler for AddonInstanceDeletionHandler {
    fn name(&self) -> &'static str {
        "addon-instance"
    }

    async fn notify_addon(&self, ctx: &Context, addon: &Addon) -> Result<()> {
        let Some(install) = addon.install_config() else {
            return Ok(());
        };
        let Some(mut instance) = ctx
            .store
            .get_addon_instance(&install.namespace, ADDON_INSTANCE_NAME)
            .await?
        else {
            debug!("No AddonInstance to notify");
            return Ok(());
        };

        if !instance.spec.marked_for_deletion {
            instance.spec.marked_for_deletion = true;
            ctx.store.update_addon_instance(&instance).await?;
        }
        Ok(())
    }

    async fn ack_received_from_addon(&self, ctx: &Context, addon: &Addon) -> Result<bool> {
        let Some(install) = addon.install_config() else {
            return Ok(false);
        };
        let instance = ctx
            .store
            .get_addon_instance(&install.namespace, ADDON_INSTANCE_NAME)
            .await?;

        Ok(instance.is_some_and(|i| {
            is_condition_true(i.conditions(), condition_types::READY_TO_BE_DELETED)
        }))
    }
}

/// Creates the delete ConfigMap older addons watch for and waits for their
/// CSV to disappear
pub struct LegacyDeletionHandler;

#[async_trait]
impl DeletionHandler for LegacyDeletionHandler {
    fn name(&self) -> &'static str {
        "legacy-configmap"
    }

    async fn notify_addon(&self, ctx: &Context, addon: &Addon) -> Result<()> {
        let Some(install) = addon.install_config() else {
            return Ok(());
        };
        let label = addon.delete_config_map_label();
        let existing = ctx
            .store
            .list_config_maps_uncached(&install.namespace, &label)
            .await?;
        if !existing.is_empty() {
            return Ok(());
        }

        let mut metadata = owned_metadata(addon, &addon.name_any(), Some(&install.namespace));
        metadata
            .labels
            .get_or_insert_with(BTreeMap::new)
            .insert(label, String::new());
        ctx.store
            .create_config_map(&ConfigMap {
                metadata,
                ..Default::default()
            })
            .await
    }

    async fn ack_received_from_addon(&self, ctx: &Context, addon: &Addon) -> Result<bool> {
        let Some(install) = addon.install_config() else {
            return Ok(false);
        };
        let key = operator_key(&install.package_name, &install.namespace);
        let Some(operator) = ctx.store.get_operator(&key).await? else {
            return Ok(true);
        };

        let csv_present = operator
            .component_refs()
            .iter()
            .any(|r| r.kind.as_deref() == Some(CSV_KIND));
        Ok(!csv_present)
    }
}
