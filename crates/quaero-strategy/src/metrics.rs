//! Per-strategy execution metrics.
//!
//! Append-only records keyed by strategy id. Records are never mutated
//! after insertion except for feedback amendment by session id, so a
//! plain mutex around the vector is enough.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// One recorded agent execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub session_id: Uuid,
    pub strategy_id: String,
    pub duration_ms: u64,
    pub tokens_used: u64,
    pub iterations: u32,
    pub documents_found: usize,
    /// Whether a non-fallback answer was produced.
    pub answered: bool,
    /// User feedback score in [-1, 1], amended after the fact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f32>,
    pub at: DateTime<Utc>,
}

/// Aggregated view of one strategy's executions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySummary {
    pub strategy_id: String,
    pub executions: usize,
    pub avg_duration_ms: f64,
    pub avg_tokens: f64,
    pub avg_iterations: f64,
    pub answer_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_feedback: Option<f64>,
}

/// Metrics store shared across requests.
pub struct StrategyMetrics {
    records: Mutex<Vec<ExecutionRecord>>,
}

impl StrategyMetrics {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Append one execution record.
    pub fn record(&self, record: ExecutionRecord) {
        debug!(
            strategy_id = %record.strategy_id,
            session_id = %record.session_id,
            duration_ms = record.duration_ms,
            "Recording strategy execution"
        );
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }

    /// Amend a past record with user feedback. Returns false when the
    /// session is unknown.
    pub fn add_feedback(&self, session_id: Uuid, score: f32) -> bool {
        let mut records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match records.iter_mut().find(|r| r.session_id == session_id) {
            Some(record) => {
                record.feedback = Some(score.clamp(-1.0, 1.0));
                true
            }
            None => false,
        }
    }

    /// All records for one strategy, in insertion order.
    pub fn for_strategy(&self, strategy_id: &str) -> Vec<ExecutionRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|r| r.strategy_id == strategy_id)
            .cloned()
            .collect()
    }

    /// Aggregate one strategy's records. None when no executions exist.
    pub fn summarize(&self, strategy_id: &str) -> Option<StrategySummary> {
        let records = self.for_strategy(strategy_id);
        if records.is_empty() {
            return None;
        }
        let n = records.len() as f64;
        let feedback: Vec<f32> = records.iter().filter_map(|r| r.feedback).collect();
        Some(StrategySummary {
            strategy_id: strategy_id.to_string(),
            executions: records.len(),
            avg_duration_ms: records.iter().map(|r| r.duration_ms as f64).sum::<f64>() / n,
            avg_tokens: records.iter().map(|r| r.tokens_used as f64).sum::<f64>() / n,
            avg_iterations: records.iter().map(|r| f64::from(r.iterations)).sum::<f64>() / n,
            answer_rate: records.iter().filter(|r| r.answered).count() as f64 / n,
            avg_feedback: if feedback.is_empty() {
                None
            } else {
                Some(feedback.iter().map(|f| f64::from(*f)).sum::<f64>() / feedback.len() as f64)
            },
        })
    }

    /// Compare several strategies side by side. Strategies without
    /// executions are omitted.
    pub fn compare(&self, strategy_ids: &[&str]) -> Vec<StrategySummary> {
        strategy_ids
            .iter()
            .filter_map(|id| self.summarize(id))
            .collect()
    }
}

impl Default for StrategyMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(strategy_id: &str, duration_ms: u64, answered: bool) -> ExecutionRecord {
        ExecutionRecord {
            session_id: Uuid::new_v4(),
            strategy_id: strategy_id.to_string(),
            duration_ms,
            tokens_used: 1000,
            iterations: 2,
            documents_found: 5,
            answered,
            feedback: None,
            at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_summarize() {
        let metrics = StrategyMetrics::new();
        metrics.record(record("enhanced", 100, true));
        metrics.record(record("enhanced", 300, false));

        let summary = metrics.summarize("enhanced").unwrap();
        assert_eq!(summary.executions, 2);
        assert!((summary.avg_duration_ms - 200.0).abs() < 1e-9);
        assert!((summary.answer_rate - 0.5).abs() < 1e-9);
        assert!(summary.avg_feedback.is_none());
    }

    #[test]
    fn test_summarize_unknown_strategy() {
        let metrics = StrategyMetrics::new();
        assert!(metrics.summarize("ghost").is_none());
    }

    #[test]
    fn test_feedback_amendment() {
        let metrics = StrategyMetrics::new();
        let rec = record("enhanced", 100, true);
        let session_id = rec.session_id;
        metrics.record(rec);

        assert!(metrics.add_feedback(session_id, 0.8));
        let summary = metrics.summarize("enhanced").unwrap();
        assert!((summary.avg_feedback.unwrap() - 0.8).abs() < 1e-6);

        // Unknown sessions are reported, not invented.
        assert!(!metrics.add_feedback(Uuid::new_v4(), 1.0));
    }

    #[test]
    fn test_feedback_clamped() {
        let metrics = StrategyMetrics::new();
        let rec = record("enhanced", 100, true);
        let session_id = rec.session_id;
        metrics.record(rec);

        metrics.add_feedback(session_id, 5.0);
        let records = metrics.for_strategy("enhanced");
        assert_eq!(records[0].feedback, Some(1.0));
    }

    #[test]
    fn test_compare_omits_unexecuted() {
        let metrics = StrategyMetrics::new();
        metrics.record(record("enhanced", 100, true));
        metrics.record(record("legal", 200, true));

        let comparison = metrics.compare(&["enhanced", "legal", "ghost"]);
        assert_eq!(comparison.len(), 2);
        assert_eq!(comparison[0].strategy_id, "enhanced");
        assert_eq!(comparison[1].strategy_id, "legal");
    }

    #[test]
    fn test_records_isolated_per_strategy() {
        let metrics = StrategyMetrics::new();
        metrics.record(record("a", 100, true));
        metrics.record(record("b", 200, true));
        assert_eq!(metrics.for_strategy("a").len(), 1);
        assert_eq!(metrics.for_strategy("b").len(), 1);
    }
}
