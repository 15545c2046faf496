mod addon;
mod addon_instance;
mod addon_operator;
mod olm;

pub use addon::*;
pub use addon_instance::*;
pub use addon_operator::*;
pub use olm::*;
