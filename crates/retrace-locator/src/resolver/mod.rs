//! Locator resolution with an ordered fallback chain.

mod strategies;

use retrace_protocols::{Document, LocatorError, NodeId};
use tracing::debug;

pub use strategies::{ExactMatch, FormName, IdFragment, LastAttributeSegment, StripPositional};

/// One way of turning a locator string into an element.
pub trait ResolveStrategy: Send + Sync {
    /// Returns the strategy name.
    fn name(&self) -> &str;

    fn try_resolve(&self, doc: &Document, locator: &str) -> Option<NodeId>;
}

/// Tries each strategy in priority order; the first hit wins.
pub struct LocatorResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
}

impl Default for LocatorResolver {
    fn default() -> Self {
        Self::empty()
            .with_strategy(ExactMatch)
            .with_strategy(StripPositional)
            .with_strategy(LastAttributeSegment)
            .with_strategy(FormName)
            .with_strategy(IdFragment)
    }
}

impl LocatorResolver {
    pub fn empty() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy at the lowest priority.
    pub fn with_strategy(mut self, strategy: impl ResolveStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn resolve(&self, doc: &Document, locator: &str) -> Result<NodeId, LocatorError> {
        for strategy in &self.strategies {
            if let Some(node) = strategy.try_resolve(doc, locator) {
                debug!(locator, strategy = strategy.name(), "Resolved locator");
                return Ok(node);
            }
        }
        Err(LocatorError::ElementNotFound(locator.to_string()))
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
