//! The enhanced (default) strategy.

use crate::{Strategy, StrategyConfig, StrategyMetadata};

/// Default general-purpose strategy: standard prompts, RRF fusion with
/// cross-match boost and length adjustments, confidence-gated exits.
pub struct EnhancedStrategy {
    metadata: StrategyMetadata,
    config: StrategyConfig,
}

impl EnhancedStrategy {
    pub fn new() -> Self {
        Self {
            metadata: StrategyMetadata {
                id: "enhanced".to_string(),
                version: "2".to_string(),
                domains: Vec::new(),
                tags: Vec::new(),
                is_default: true,
                is_legacy: false,
            },
            config: StrategyConfig::default(),
        }
    }
}

impl Default for EnhancedStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for EnhancedStrategy {
    fn metadata(&self) -> &StrategyMetadata {
        &self.metadata
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }
}
