//! Tri-state outcome shared by every reconcile phase

use std::time::Duration;

use kube::runtime::controller::Action;

/// Delay used when a phase needs to be called again right away
pub const IMMEDIATE_REQUEUE: Duration = Duration::from_secs(1);

/// Outcome of a phase or of a whole reconcile pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Move on to the next phase
    Continue,
    /// Stop this pass and wait for an external change
    Stop,
    /// Stop this pass and run again after the given delay
    RequeueAfter(Duration),
}

impl ReconcileResult {
    pub fn is_continue(&self) -> bool {
        matches!(self, ReconcileResult::Continue)
    }

    /// Convert into a controller action; `resync` applies to passes that completed
    pub fn into_action(self, resync: Duration) -> Action {
        match self {
            ReconcileResult::Continue => Action::requeue(resync),
            ReconcileResult::Stop => Action::await_change(),
            ReconcileResult::RequeueAfter(delay) => Action::requeue(delay),
        }
    }
}
