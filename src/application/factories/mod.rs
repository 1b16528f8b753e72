mod fix_selector_factory;

pub use fix_selector_factory::{FixSelectorFactory, ReasoningOptions};
