pub mod addon_instance;
pub mod common;
pub mod network_policy;
pub mod olm;

pub use common::{API_VERSION, FIELD_MANAGER, KIND, addon_labels, owner_reference};
