//! Strategy registry with lookup by id, domain, and content-based
//! auto-detection.
//!
//! Constructed once at process start and threaded through the
//! coordinator; read-only afterward, so concurrent reads need no
//! locking.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use quaero_core::{Error, Result};

use crate::domains::{HrStrategy, LegalStrategy, SoftwareDevStrategy};
use crate::enhanced::EnhancedStrategy;
use crate::legacy::LegacyStrategy;
use crate::{Strategy, StrategyMetadata};

/// Additive score bonus that breaks auto-detection ties toward the
/// configured default strategy.
const DEFAULT_TIE_BONUS: f32 = 0.5;

/// Catalog of registered strategies.
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
    by_id: HashMap<String, usize>,
    default_id: Option<String>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
            by_id: HashMap::new(),
            default_id: None,
        }
    }

    /// Registry with every built-in strategy registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EnhancedStrategy::new()));
        registry.register(Arc::new(LegacyStrategy::new()));
        registry.register(Arc::new(SoftwareDevStrategy::new()));
        registry.register(Arc::new(LegalStrategy::new()));
        registry.register(Arc::new(HrStrategy::new()));
        registry
    }

    /// Register a strategy. A strategy flagged default becomes the
    /// designated default; registering a second default replaces the
    /// designation with a warning.
    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        let meta = strategy.metadata().clone();
        info!(
            strategy_id = %meta.id,
            version = %meta.version,
            domains = ?meta.domains,
            is_default = meta.is_default,
            "Registering strategy"
        );
        if meta.is_default {
            if let Some(previous) = &self.default_id {
                if previous != &meta.id {
                    warn!(
                        previous = %previous,
                        new = %meta.id,
                        "Replacing designated default strategy"
                    );
                }
            }
            self.default_id = Some(meta.id.clone());
        }
        if let Some(idx) = self.by_id.get(&meta.id) {
            self.strategies[*idx] = strategy;
        } else {
            self.by_id.insert(meta.id.clone(), self.strategies.len());
            self.strategies.push(strategy);
        }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Metadata of every registered strategy, in registration order.
    pub fn list(&self) -> Vec<StrategyMetadata> {
        self.strategies
            .iter()
            .map(|s| s.metadata().clone())
            .collect()
    }

    /// Lookup by exact id. Unknown ids are an error listing what is
    /// available — an explicitly requested bad id is a caller bug, not
    /// something to paper over.
    pub fn get(&self, id: &str) -> Result<Arc<dyn Strategy>> {
        self.by_id
            .get(id)
            .map(|idx| self.strategies[*idx].clone())
            .ok_or_else(|| {
                let available: Vec<&str> =
                    self.strategies.iter().map(|s| s.metadata().id.as_str()).collect();
                Error::NotFound(format!(
                    "strategy '{id}' (available: {})",
                    available.join(", ")
                ))
            })
    }

    /// Best strategy for a domain: exact domain match first, then any
    /// general-purpose (domain-less, non-legacy) strategy, then the
    /// default resolution chain.
    pub fn for_domain(&self, domain: &str) -> Result<Arc<dyn Strategy>> {
        let domain = domain.to_lowercase();
        if let Some(s) = self.strategies.iter().find(|s| {
            s.metadata().domains.iter().any(|d| d.to_lowercase() == domain)
        }) {
            debug!(strategy_id = %s.metadata().id, domain = %domain, "Domain match");
            return Ok(s.clone());
        }
        if let Some(s) = self
            .strategies
            .iter()
            .find(|s| s.metadata().domains.is_empty() && !s.metadata().is_legacy)
        {
            debug!(strategy_id = %s.metadata().id, domain = %domain, "General-purpose fallback");
            return Ok(s.clone());
        }
        self.default_strategy()
    }

    /// Content-based auto-detection: score every non-legacy strategy's
    /// keyword overlap against the query and pick the maximum, with a
    /// small additive bonus toward the default for tie-breaking.
    pub fn auto_detect(&self, query: &str) -> Result<Arc<dyn Strategy>> {
        if self.strategies.is_empty() {
            return Err(Error::Config(
                "strategy catalog is empty; register at least one strategy at startup".to_string(),
            ));
        }

        let query_lower = query.to_lowercase();
        let query_words: Vec<&str> = query_lower.split_whitespace().collect();

        let mut best: Option<(f32, &Arc<dyn Strategy>)> = None;
        for strategy in self.strategies.iter().filter(|s| !s.metadata().is_legacy) {
            let meta = strategy.metadata();
            let keywords = meta.tags.iter().chain(meta.domains.iter());
            let overlap = keywords
                .filter(|kw| {
                    let kw = kw.to_lowercase();
                    query_words.iter().any(|w| *w == kw) || query_lower.contains(&kw)
                })
                .count() as f32;
            let score = overlap
                + if meta.is_default {
                    DEFAULT_TIE_BONUS
                } else {
                    0.0
                };
            debug!(strategy_id = %meta.id, score, "Auto-detect score");
            // Strictly greater keeps the first maximum, making
            // detection stable across runs.
            if best.map(|(s, _)| score > s).unwrap_or(true) {
                best = Some((score, strategy));
            }
        }

        match best {
            Some((_, strategy)) => Ok(strategy.clone()),
            // Every strategy was legacy; fall back to the default chain.
            None => self.default_strategy(),
        }
    }

    /// Resolve the default strategy through the fallback chain:
    /// designated default id, any default-flagged strategy, first
    /// non-legacy, any registered, hard failure on an empty catalog.
    pub fn default_strategy(&self) -> Result<Arc<dyn Strategy>> {
        if let Some(id) = &self.default_id {
            if let Some(idx) = self.by_id.get(id) {
                return Ok(self.strategies[*idx].clone());
            }
            warn!(default_id = %id, "Designated default missing from catalog");
        }
        if let Some(s) = self.strategies.iter().find(|s| s.metadata().is_default) {
            return Ok(s.clone());
        }
        if let Some(s) = self.strategies.iter().find(|s| !s.metadata().is_legacy) {
            warn!(strategy_id = %s.metadata().id, "No default designated, using first non-legacy");
            return Ok(s.clone());
        }
        if let Some(s) = self.strategies.first() {
            warn!(strategy_id = %s.metadata().id, "Only legacy strategies registered");
            return Ok(s.clone());
        }
        Err(Error::Config(
            "strategy catalog is empty; register at least one strategy at startup".to_string(),
        ))
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StrategyConfig;

    struct Bare {
        meta: StrategyMetadata,
        config: StrategyConfig,
    }

    impl Bare {
        fn new(id: &str, is_default: bool, is_legacy: bool, domains: &[&str], tags: &[&str]) -> Self {
            Self {
                meta: StrategyMetadata {
                    id: id.to_string(),
                    version: "1".to_string(),
                    domains: domains.iter().map(|s| s.to_string()).collect(),
                    tags: tags.iter().map(|s| s.to_string()).collect(),
                    is_default,
                    is_legacy,
                },
                config: StrategyConfig::default(),
            }
        }
    }

    impl Strategy for Bare {
        fn metadata(&self) -> &StrategyMetadata {
            &self.meta
        }
        fn config(&self) -> &StrategyConfig {
            &self.config
        }
    }

    #[test]
    fn test_get_unknown_id_lists_available() {
        let registry = StrategyRegistry::with_defaults();
        let err = match registry.get("nope") {
            Ok(_) => panic!("called `Result::unwrap_err()` on an `Ok` value"),
            Err(e) => e,
        };
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("enhanced"));
    }

    #[test]
    fn test_get_known_id() {
        let registry = StrategyRegistry::with_defaults();
        let strategy = registry.get("legal").unwrap();
        assert_eq!(strategy.metadata().id, "legal");
    }

    #[test]
    fn test_with_defaults_has_one_default() {
        let registry = StrategyRegistry::with_defaults();
        let defaults: Vec<_> = registry
            .list()
            .into_iter()
            .filter(|m| m.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, "enhanced");
    }

    #[test]
    fn test_domain_lookup() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.for_domain("legal").unwrap().metadata().id, "legal");
        assert_eq!(registry.for_domain("hr").unwrap().metadata().id, "hr");
        // Unknown domain falls back to a general-purpose strategy.
        assert_eq!(
            registry.for_domain("astrophysics").unwrap().metadata().id,
            "enhanced"
        );
    }

    #[test]
    fn test_auto_detect_no_domain_keywords_returns_default() {
        let registry = StrategyRegistry::with_defaults();
        let strategy = registry
            .auto_detect("what is the meaning of the quarterly numbers")
            .unwrap();
        assert_eq!(strategy.metadata().id, "enhanced");
    }

    #[test]
    fn test_auto_detect_matches_domain_keywords() {
        let registry = StrategyRegistry::with_defaults();
        let strategy = registry
            .auto_detect("what does the liability clause in the vendor contract say")
            .unwrap();
        assert_eq!(strategy.metadata().id, "legal");

        let strategy = registry
            .auto_detect("how do I request parental leave under the vacation policy")
            .unwrap();
        assert_eq!(strategy.metadata().id, "hr");
    }

    #[test]
    fn test_auto_detect_ignores_legacy() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Bare::new(
            "old",
            false,
            true,
            &[],
            &["contract", "clause"],
        )));
        registry.register(Arc::new(Bare::new("new", true, false, &[], &[])));
        let strategy = registry.auto_detect("contract clause question").unwrap();
        assert_eq!(strategy.metadata().id, "new");
    }

    #[test]
    fn test_empty_registry_is_hard_error() {
        let registry = StrategyRegistry::new();
        assert!(registry.default_strategy().is_err());
        assert!(registry.auto_detect("anything").is_err());
    }

    #[test]
    fn test_default_fallback_first_non_legacy() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Bare::new("legacy_one", false, true, &[], &[])));
        registry.register(Arc::new(Bare::new("plain", false, false, &[], &[])));
        assert_eq!(registry.default_strategy().unwrap().metadata().id, "plain");
    }

    #[test]
    fn test_default_fallback_any_registered() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Bare::new("legacy_only", false, true, &[], &[])));
        assert_eq!(
            registry.default_strategy().unwrap().metadata().id,
            "legacy_only"
        );
    }

    #[test]
    fn test_reregistering_same_id_replaces() {
        let mut registry = StrategyRegistry::new();
        registry.register(Arc::new(Bare::new("x", false, false, &[], &[])));
        registry.register(Arc::new(Bare::new("x", false, false, &["legal"], &[])));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].domains, vec!["legal".to_string()]);
    }
}
