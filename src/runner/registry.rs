//! Subtest namespace
//!
//! Subtests are looked up by name at the moment their command runs. A
//! subtest `scroll` is registered under the symbol `test_scroll`.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::common::{Error, Result};

use super::timer::Timer;

/// Prefix every subtest symbol carries
pub const SUBTEST_SYMBOL_PREFIX: &str = "test_";

/// A subtest body: receives its timer, settles when the timed work is done
pub type SubtestFn = Arc<dyn Fn(Timer) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Symbol a subtest name resolves to
pub fn symbol_for(name: &str) -> String {
    format!("{}{}", SUBTEST_SYMBOL_PREFIX, name)
}

/// Name-indexed table of subtest functions
#[derive(Clone, Default)]
pub struct SubtestRegistry {
    symbols: HashMap<String, SubtestFn>,
}

impl SubtestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subtest` as `test_<name>`, replacing any previous entry
    pub fn register<F, Fut>(&mut self, name: &str, subtest: F) -> &mut Self
    where
        F: Fn(Timer) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let symbol = symbol_for(name);
        if self.symbols.contains_key(&symbol) {
            tracing::warn!(%symbol, "replacing registered subtest");
        }
        self.symbols
            .insert(symbol, Arc::new(move |timer: Timer| subtest(timer).boxed()));
        self
    }

    /// Look up the function registered for subtest `name`
    pub fn resolve(&self, name: &str) -> Result<SubtestFn> {
        let symbol = symbol_for(name);
        self.symbols
            .get(&symbol)
            .cloned()
            .ok_or_else(|| Error::subtest_not_found(name, &symbol))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(&symbol_for(name))
    }

    /// Registered subtest names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .symbols
            .keys()
            .filter_map(|s| s.strip_prefix(SUBTEST_SYMBOL_PREFIX))
            .map(str::to_string)
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_registered() {
        let mut registry = SubtestRegistry::new();
        registry
            .register("open", |_timer| async { Ok(()) })
            .register("close", |_timer| async { Ok(()) });

        assert!(registry.contains("open"));
        assert!(registry.resolve("close").is_ok());
        assert_eq!(registry.names(), ["close", "open"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_resolve_missing_names_symbol() {
        let registry = SubtestRegistry::new();
        let err = registry.resolve("scroll").err().expect("lookup should fail");
        match err {
            Error::SubtestNotFound { name, symbol } => {
                assert_eq!(name, "scroll");
                assert_eq!(symbol, "test_scroll");
            }
            other => panic!("Expected SubtestNotFound, got {other:?}"),
        }
    }
}
