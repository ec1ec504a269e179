//! The pluggable surface threaded through `compile`/`search`.
//!
//! Grounded on the teacher's `Cli` (`src/bin/why.rs`): a small struct of toggles built with
//! `Default`/builder methods and threaded down into the core entry points, rather than a
//! configuration file or environment variables.
use crate::registry::Registry;
use crate::value::OrderedMap;

/// A constructor for the ordered mapping type the evaluator builds when it materializes a new
/// object (`multi_select_dict`, `from_items`, `merge`, `group_by`). Defaults to
/// [`OrderedMap::from_pairs`]; callers that need a different key-collision or ordering policy can
/// supply their own.
pub type MapBuilder = fn(Vec<(String, crate::value::Value)>) -> OrderedMap;

/// Options accepted by [`crate::compile`] and [`crate::Expression::search`].
#[derive(Clone)]
pub struct Options {
    pub dict_cls: MapBuilder,
    pub custom_functions: Registry,
    pub enable_legacy_literals: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dict_cls: OrderedMap::from_pairs,
            custom_functions: Registry::empty(),
            enable_legacy_literals: false,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_legacy_literals(mut self, enabled: bool) -> Self {
        self.enable_legacy_literals = enabled;
        self
    }

    pub fn with_custom_functions(mut self, registry: Registry) -> Self {
        self.custom_functions = registry;
        self
    }

    pub fn with_dict_cls(mut self, dict_cls: MapBuilder) -> Self {
        self.dict_cls = dict_cls;
        self
    }
}
