//! Status and conditions management for Addon resources
//!
//! Every phase records its outcome through the helpers in this module so that
//! conditions stay unique by type and keep their transition time until the
//! status actually flips.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::crd::{Addon, AddonPhase, Condition};

/// Condition types written on Addons
pub mod condition_types {
    /// Addon is fully reconciled and healthy
    pub const AVAILABLE: &str = "Available";
    /// Reconciliation is paused globally or for this addon
    pub const PAUSED: &str = "Paused";
    /// Addon operator bundle is installed
    pub const INSTALLED: &str = "Installed";
    /// A version change is in progress
    pub const UPGRADE_STARTED: &str = "UpgradeStarted";
    /// The last version change completed
    pub const UPGRADE_SUCCEEDED: &str = "UpgradeSucceeded";
    /// Deletion was acknowledged by the addon workload
    pub const READY_TO_BE_DELETED: &str = "ReadyToBeDeleted";
    /// The addon workload did not acknowledge deletion in time
    pub const DELETE_TIMEOUT: &str = "DeleteTimeout";
}

/// Condition status values
pub mod condition_status {
    pub const TRUE: &str = "True";
    pub const FALSE: &str = "False";
    pub const UNKNOWN: &str = "Unknown";
}

/// Condition reasons
pub mod reasons {
    pub const FULLY_RECONCILED: &str = "FullyReconciled";
    pub const TERMINATING: &str = "Terminating";
    pub const ADDON_OPERATOR_PAUSED: &str = "AddonOperatorPaused";
    pub const ADDON_PAUSED: &str = "AddonPaused";
    pub const CONFIGURATION_ERROR: &str = "ConfigurationError";
    pub const NOT_INSTALLED: &str = "AddonNotInstalled";
    pub const INSTALLED: &str = "AddonInstalled";
    pub const UNREADY_CSV: &str = "UnreadyCSV";
    pub const MISSING_CSV: &str = "MissingCSV";
    pub const INSTALL_PLAN_PENDING: &str = "InstallPlanPending";
    pub const UNREADY_ADDON_INSTANCE: &str = "UnreadyAddonInstance";
    pub const UPGRADE_STARTED: &str = "AddonUpgradeStarted";
    pub const UPGRADE_SUCCEEDED: &str = "AddonUpgradeSucceeded";
    pub const READY_TO_BE_DELETED: &str = "AddonReadyToBeDeleted";
    pub const NOT_READY_TO_BE_DELETED: &str = "AddonNotReadyToBeDeleted";
    pub const DELETE_TIMED_OUT: &str = "AddonDeleteTimedOut";
    pub const ADDON_OPERATOR_READY: &str = "AddonOperatorReady";
}

/// Marker some addons put in the Available message to keep the operator from
/// declaring them ready
pub const PACKAGE_OPERATOR_MARKER: &str = "PackageOperator";

/// Serialize a timestamp the way the API server does
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a condition transition time
pub fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

/// Builder for creating and updating status conditions
pub struct ConditionBuilder {
    conditions: Vec<Condition>,
    generation: Option<i64>,
    now: DateTime<Utc>,
}

impl ConditionBuilder {
    /// Create a new condition builder
    pub fn new(generation: Option<i64>, now: DateTime<Utc>) -> Self {
        Self {
            conditions: Vec::new(),
            generation,
            now,
        }
    }

    /// Create from existing conditions
    pub fn from_existing(
        existing: Vec<Condition>,
        generation: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            conditions: existing,
            generation,
            now,
        }
    }

    /// Set a condition, updating if it exists or adding if it doesn't
    pub fn set_condition(mut self, type_: &str, status: &str, reason: &str, message: &str) -> Self {
        if let Some(existing) = self.conditions.iter_mut().find(|c| c.type_ == type_) {
            if existing.status != status {
                existing.status = status.to_string();
                existing.last_transition_time = format_time(self.now);
            }
            existing.reason = reason.to_string();
            existing.message = message.to_string();
            existing.observed_generation = self.generation;
        } else {
            self.conditions.push(Condition {
                type_: type_.to_string(),
                status: status.to_string(),
                reason: reason.to_string(),
                message: message.to_string(),
                last_transition_time: format_time(self.now),
                observed_generation: self.generation,
            });
        }
        self
    }

    /// Drop a condition by type
    pub fn remove_condition(mut self, type_: &str) -> Self {
        self.conditions.retain(|c| c.type_ != type_);
        self
    }

    /// Build the conditions list
    pub fn build(self) -> Vec<Condition> {
        self.conditions
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

pub fn is_condition_true(conditions: &[Condition], type_: &str) -> bool {
    find_condition(conditions, type_).is_some_and(|c| c.status == condition_status::TRUE)
}

pub fn is_condition_false(conditions: &[Condition], type_: &str) -> bool {
    find_condition(conditions, type_).is_some_and(|c| c.status == condition_status::FALSE)
}

fn bool_status(value: bool) -> &'static str {
    if value {
        condition_status::TRUE
    } else {
        condition_status::FALSE
    }
}

/// Upsert a condition on the addon status
pub fn set_addon_condition(
    addon: &mut Addon,
    type_: &str,
    status: bool,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) {
    let generation = addon.metadata.generation;
    let status_ref = addon.status_mut();
    let existing = std::mem::take(&mut status_ref.conditions);
    status_ref.conditions = ConditionBuilder::from_existing(existing, generation, now)
        .set_condition(type_, bool_status(status), reason, message)
        .build();
}

/// Remove a condition from the addon status
pub fn remove_addon_condition(addon: &mut Addon, type_: &str) {
    if let Some(status) = addon.status.as_mut() {
        status.conditions.retain(|c| c.type_ != type_);
    }
}

/// Available=False with the given reason
pub fn report_unready(addon: &mut Addon, reason: &str, message: &str, now: DateTime<Utc>) {
    set_addon_condition(
        addon,
        condition_types::AVAILABLE,
        false,
        reason,
        message,
        now,
    );
}

/// Phase=Error and Available=False/ConfigurationError
pub fn report_configuration_error(addon: &mut Addon, message: &str, now: DateTime<Utc>) {
    report_unready(addon, reasons::CONFIGURATION_ERROR, message, now);
    addon.status_mut().phase = AddonPhase::Error;
}

/// Phase=Terminating and Available=False/Terminating
pub fn report_terminating(addon: &mut Addon, now: DateTime<Utc>) {
    report_unready(
        addon,
        reasons::TERMINATING,
        "Addon is being deleted",
        now,
    );
    addon.status_mut().phase = AddonPhase::Terminating;
}

pub fn report_paused(addon: &mut Addon, reason: &str, message: &str, now: DateTime<Utc>) {
    set_addon_condition(addon, condition_types::PAUSED, true, reason, message, now);
}

pub fn report_installed(addon: &mut Addon, now: DateTime<Utc>) {
    set_addon_condition(
        addon,
        condition_types::INSTALLED,
        true,
        reasons::INSTALLED,
        "Addon has been successfully installed",
        now,
    );
}

pub fn report_not_installed(addon: &mut Addon, message: &str, now: DateTime<Utc>) {
    set_addon_condition(
        addon,
        condition_types::INSTALLED,
        false,
        reasons::NOT_INSTALLED,
        message,
        now,
    );
}

/// Record the start of a version change
pub fn report_upgrade_started(addon: &mut Addon, now: DateTime<Utc>) {
    let version = addon.spec.version.clone();
    set_addon_condition(
        addon,
        condition_types::UPGRADE_STARTED,
        true,
        reasons::UPGRADE_STARTED,
        &format!("Addon upgrade to version {} started", version),
        now,
    );
    remove_addon_condition(addon, condition_types::UPGRADE_SUCCEEDED);
    addon.status_mut().observed_version = version;
}

/// Conclude a version change
pub fn report_upgrade_succeeded(addon: &mut Addon, now: DateTime<Utc>) {
    let version = addon.spec.version.clone();
    remove_addon_condition(addon, condition_types::UPGRADE_STARTED);
    set_addon_condition(
        addon,
        condition_types::UPGRADE_SUCCEEDED,
        true,
        reasons::UPGRADE_SUCCEEDED,
        &format!("Addon upgrade to version {} succeeded", version),
        now,
    );
}

/// Available=True, Phase=Ready, unless a PackageOperator-managed addon still
/// owns the Available condition
pub fn report_ready(addon: &mut Addon, now: DateTime<Utc>) {
    let vetoed = find_condition(addon.conditions(), condition_types::AVAILABLE)
        .is_some_and(|c| c.message.contains(PACKAGE_OPERATOR_MARKER));
    if vetoed {
        return;
    }

    set_addon_condition(
        addon,
        condition_types::AVAILABLE,
        true,
        reasons::FULLY_RECONCILED,
        "All components are ready",
        now,
    );
    let generation = addon.metadata.generation;
    let version = addon.spec.version.clone();
    let status = addon.status_mut();
    status.phase = AddonPhase::Ready;
    status.observed_generation = generation;
    status.observed_version = version;
}
