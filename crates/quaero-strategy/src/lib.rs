//! # quaero-strategy
//!
//! Pluggable policy objects that decouple "what prompt to use, how to
//! score, when to stop" from the orchestration mechanics. Each
//! strategy supplies phase prompts, analysis post-processing, an
//! early-exit predicate, and a fusion scoring override; the control
//! loop in quaero-agent is identical across all of them.

pub mod analysis;
pub mod domains;
pub mod enhanced;
pub mod legacy;
pub mod metrics;
pub mod prompts;
pub mod registry;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use quaero_core::{
    DataSource, DocumentReference, EvalDecision, EvaluationDecision, ResultQuality, SearchHit,
    WorkerResult,
};
use quaero_search::fusion::{self, FusionConfig};

pub use metrics::{ExecutionRecord, StrategyMetrics, StrategySummary};
pub use registry::StrategyRegistry;

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Orchestration phase a prompt is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Analyze,
    Plan,
    Evaluate,
    Synthesize,
    FastResponse,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyze => "analyze",
            Self::Plan => "plan",
            Self::Evaluate => "evaluate",
            Self::Synthesize => "synthesize",
            Self::FastResponse => "fast_response",
        }
    }
}

// ---------------------------------------------------------------------------
// Metadata and configuration
// ---------------------------------------------------------------------------

/// Identity and routing metadata for a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyMetadata {
    pub id: String,
    pub version: String,
    /// Domains this strategy specializes in (empty = general purpose).
    pub domains: Vec<String>,
    /// Keywords used by content-based auto-detection.
    pub tags: Vec<String>,
    pub is_default: bool,
    pub is_legacy: bool,
}

/// Behavioral tunables every strategy carries. Concrete strategies
/// differ only in these values, their prompt text, and their fusion
/// keyword lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub max_iterations: u32,
    /// Confidence gate for the sufficient-decision early exit.
    pub confidence_threshold: f32,
    pub cross_search_boost: f32,
    /// Hardest length-penalty multiplier.
    pub content_length_penalty: f32,
    /// Content below this length takes the hardest penalty.
    pub min_content_length: usize,
    /// Fusion keyword bonus list (empty = no bonus).
    pub fusion_keywords: Vec<String>,
    pub fusion_keyword_boost: f32,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            confidence_threshold: 0.8,
            cross_search_boost: 1.15,
            content_length_penalty: 0.5,
            min_content_length: 50,
            fusion_keywords: Vec::new(),
            fusion_keyword_boost: 1.0,
        }
    }
}

impl StrategyConfig {
    /// Project this config onto the fusion engine's tunables.
    pub fn fusion_config(&self) -> FusionConfig {
        FusionConfig::default()
            .with_cross_match_boost(self.cross_search_boost)
            .with_min_content_length(self.min_content_length)
            .with_keywords(self.fusion_keywords.clone(), self.fusion_keyword_boost)
    }
}

// ---------------------------------------------------------------------------
// Strategy trait
// ---------------------------------------------------------------------------

/// Capability set every strategy implements.
///
/// Default method bodies implement the standard (enhanced) behavior so
/// concrete strategies override only what they change.
pub trait Strategy: Send + Sync {
    fn metadata(&self) -> &StrategyMetadata;

    fn config(&self) -> &StrategyConfig;

    /// Prompt template for a phase. Templates use `{placeholder}`
    /// substitution; see [`prompts`].
    fn prompt_for(&self, phase: Phase) -> String {
        prompts::default_prompt(phase).to_string()
    }

    /// Normalize a raw analysis JSON into the shape downstream code
    /// relies on. Total: absent or malformed fields get conservative
    /// defaults, never an error.
    fn post_process_analysis(&self, raw: Value) -> Value {
        analysis::normalize_analysis(raw)
    }

    /// Early-exit predicate.
    ///
    /// Called with `evaluation = None` after a batch completes (the
    /// pre-evaluation quality check, applied on iteration 1 only) and
    /// with `Some` after each evaluation (the confidence gate).
    fn should_exit_early(
        &self,
        results: &[WorkerResult],
        evaluation: Option<&EvaluationDecision>,
        iteration: u32,
    ) -> bool {
        match evaluation {
            Some(eval) => {
                eval.decision == EvalDecision::Sufficient
                    && eval.confidence >= self.config().confidence_threshold
            }
            None => iteration == 1 && iteration_quality_exit(results),
        }
    }

    /// Fusion tunables for this strategy.
    fn fusion_config(&self) -> FusionConfig {
        self.config().fusion_config()
    }

    /// Fuse one source's hits. The default applies the shared RRF core
    /// with this strategy's adjustments; a strategy may replace the
    /// whole scoring policy.
    fn fuse(
        &self,
        source: &DataSource,
        hits: Vec<SearchHit>,
        limit: usize,
    ) -> Vec<DocumentReference> {
        fusion::fuse(source, hits, limit, &self.fusion_config())
    }
}

/// Iteration-level quality signal: exit when the first batch already
/// looks strong. Requires at least two good-or-better results, plus
/// either two excellent results or three good ones with a high mean
/// document score.
pub fn iteration_quality_exit(results: &[WorkerResult]) -> bool {
    let excellent = results
        .iter()
        .filter(|r| r.quality == ResultQuality::Excellent)
        .count();
    let good = results
        .iter()
        .filter(|r| r.quality >= ResultQuality::Good)
        .count();
    if good < 2 {
        return false;
    }

    let scores: Vec<f32> = results
        .iter()
        .flat_map(|r| r.documents.iter().map(|d| d.score))
        .collect();
    if scores.is_empty() {
        return false;
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;

    excellent >= 2 || (good >= 3 && mean > 0.75)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use quaero_core::{SourceKind, TaskKind};

    fn result(quality: ResultQuality, doc_scores: &[f32]) -> WorkerResult {
        WorkerResult {
            task_id: "t".to_string(),
            kind: TaskKind::SearchAll,
            query: "q".to_string(),
            success: true,
            error: None,
            documents: doc_scores
                .iter()
                .map(|s| DocumentReference {
                    chunk_id: format!("c{s}"),
                    parent_document_id: "p".to_string(),
                    title: "t".to_string(),
                    source_kind: SourceKind::Personal,
                    source_id: "s".to_string(),
                    excerpt: "e".to_string(),
                    full_text: None,
                    score: *s,
                    metadata: Value::Null,
                })
                .collect(),
            web_refs: Vec::new(),
            quality,
            suggested_refinements: Vec::new(),
            summary: None,
            duration_ms: 1,
            tokens_used: 0,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn test_quality_exit_two_excellent() {
        let results = vec![
            result(ResultQuality::Excellent, &[0.9, 0.9]),
            result(ResultQuality::Excellent, &[0.85]),
        ];
        assert!(iteration_quality_exit(&results));
    }

    #[test]
    fn test_quality_exit_three_good_high_mean() {
        let results = vec![
            result(ResultQuality::Good, &[0.8]),
            result(ResultQuality::Good, &[0.8]),
            result(ResultQuality::Good, &[0.8]),
        ];
        assert!(iteration_quality_exit(&results));
    }

    #[test]
    fn test_quality_exit_three_good_low_mean() {
        let results = vec![
            result(ResultQuality::Good, &[0.6]),
            result(ResultQuality::Good, &[0.6]),
            result(ResultQuality::Good, &[0.6]),
        ];
        assert!(!iteration_quality_exit(&results));
    }

    #[test]
    fn test_quality_exit_needs_two_good() {
        let results = vec![result(ResultQuality::Excellent, &[0.95, 0.95])];
        assert!(!iteration_quality_exit(&results));
    }

    #[test]
    fn test_quality_exit_empty_results() {
        assert!(!iteration_quality_exit(&[]));
    }

    #[test]
    fn test_phase_as_str() {
        assert_eq!(Phase::Analyze.as_str(), "analyze");
        assert_eq!(Phase::FastResponse.as_str(), "fast_response");
    }

    #[test]
    fn test_strategy_config_fusion_projection() {
        let config = StrategyConfig {
            cross_search_boost: 1.3,
            min_content_length: 100,
            fusion_keywords: vec!["clause".to_string()],
            fusion_keyword_boost: 1.2,
            ..Default::default()
        };
        let fusion = config.fusion_config();
        assert_eq!(fusion.cross_match_boost, 1.3);
        assert_eq!(fusion.min_content_length, 100);
        assert_eq!(fusion.keywords, vec!["clause".to_string()]);
        assert_eq!(fusion.keyword_boost, 1.2);
    }
}
