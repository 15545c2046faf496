pub mod addon_operator;
pub mod context;
pub mod coordinator;
pub mod deletion;
pub mod duration;
pub mod error;
pub mod phases;
pub mod pipeline;
pub mod reconciler;
pub mod registry;
pub mod result;
pub mod status;
pub mod store;
pub mod sync;

pub use addon_operator::{AddonOperatorContext, addon_operator_error_policy, reconcile_addon_operator};
pub use context::{Clock, Context, SystemClock};
pub use coordinator::Coordinator;
pub use deletion::{DeletionHandler, DeletionHandshake};
pub use error::{BackoffConfig, Error, MultiError, Result, RetryTracker};
pub use pipeline::{AddonReconciler, FINALIZER};
pub use reconciler::{error_policy, reconcile};
pub use registry::OperatorResourceRegistry;
pub use result::ReconcileResult;
pub use status::ConditionBuilder;
pub use store::{AddonStore, KubeStore};
pub use sync::ExternalSync;
