//! Feature discovery adapters.

use std::rc::Rc;

use rigup_core::application::{Feature, ports::FeatureDiscovery};

/// Discovery backed by a list assembled by the embedding program.
///
/// A discovered feature replaces a built-in of the same name.
#[derive(Default)]
pub struct StaticDiscovery {
    features: Vec<Rc<dyn Feature>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, feature: Rc<dyn Feature>) -> Self {
        self.features.push(feature);
        self
    }
}

impl FeatureDiscovery for StaticDiscovery {
    fn discover(&self) -> Vec<Rc<dyn Feature>> {
        self.features.clone()
    }
}
