//! The legacy strategy, kept for A/B comparison against older
//! deployments. Excluded from auto-detection.

use quaero_core::{EvalDecision, EvaluationDecision, WorkerResult};

use crate::{prompts, Phase, Strategy, StrategyConfig, StrategyMetadata};

/// Pre-adjustment behavior: plain RRF (no cross-match boost, no
/// short-length penalties), a shorter iteration budget, and an exit on
/// any sufficient decision regardless of confidence.
pub struct LegacyStrategy {
    metadata: StrategyMetadata,
    config: StrategyConfig,
}

impl LegacyStrategy {
    pub fn new() -> Self {
        Self {
            metadata: StrategyMetadata {
                id: "legacy".to_string(),
                version: "1".to_string(),
                domains: Vec::new(),
                tags: Vec::new(),
                is_default: false,
                is_legacy: true,
            },
            config: StrategyConfig {
                max_iterations: 2,
                confidence_threshold: 0.7,
                cross_search_boost: 1.0,
                content_length_penalty: 1.0,
                min_content_length: 0,
                fusion_keywords: Vec::new(),
                fusion_keyword_boost: 1.0,
            },
        }
    }
}

impl Default for LegacyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for LegacyStrategy {
    fn metadata(&self) -> &StrategyMetadata {
        &self.metadata
    }

    fn config(&self) -> &StrategyConfig {
        &self.config
    }

    fn prompt_for(&self, phase: Phase) -> String {
        // Legacy deployments used the synthesize prompt for the fast
        // path as well.
        match phase {
            Phase::FastResponse => prompts::default_prompt(Phase::Synthesize).to_string(),
            _ => prompts::default_prompt(phase).to_string(),
        }
    }

    fn should_exit_early(
        &self,
        _results: &[WorkerResult],
        evaluation: Option<&EvaluationDecision>,
        _iteration: u32,
    ) -> bool {
        // No pre-evaluation quality skip; any sufficient verdict exits.
        matches!(
            evaluation,
            Some(eval) if eval.decision == EvalDecision::Sufficient
        )
    }
}
