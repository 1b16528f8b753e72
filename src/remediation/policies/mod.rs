pub mod delegated;
pub mod fix_selector;
pub mod nearest_version;

pub use delegated::DelegatedSelector;
pub use fix_selector::{FixRequest, FixSelector};
pub use nearest_version::NearestVersionSelector;
