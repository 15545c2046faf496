//! Mapping between Addons and the OLM Operator objects they produce
//!
//! Operator objects carry no owner reference to the Addon, so watch events on
//! them are routed back through this table.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Default, Debug)]
struct Entries {
    by_addon: HashMap<String, String>,
    by_operator: HashMap<String, String>,
}

#[derive(Default, Debug)]
pub struct OperatorResourceRegistry {
    entries: RwLock<Entries>,
}

impl OperatorResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `addon` to the Operator named `operator_key`.
    ///
    /// Returns true when the mapping was added or changed. Events for the new
    /// key may have been dropped before this call, so callers re-read instead
    /// of trusting what they already observed.
    pub fn register(&self, addon: &str, operator_key: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.by_addon.get(addon).map(String::as_str) == Some(operator_key) {
            return false;
        }

        if let Some(previous) = entries.by_addon.insert(addon.to_string(), operator_key.to_string())
        {
            entries.by_operator.remove(&previous);
        }
        entries
            .by_operator
            .insert(operator_key.to_string(), addon.to_string());
        true
    }

    /// Addon owning the Operator named `operator_key`
    pub fn addon_for_operator(&self, operator_key: &str) -> Option<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.by_operator.get(operator_key).cloned()
    }

    /// Drop the mapping of a deleted addon
    pub fn free(&self, addon: &str) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = entries.by_addon.remove(addon) {
            entries.by_operator.remove(&key);
        }
    }
}
