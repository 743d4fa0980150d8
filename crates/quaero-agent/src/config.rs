//! Agent configuration.

use std::time::Duration;

use serde_json::{json, Value};

/// Configuration for the coordinator and worker pool.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum concurrently executing worker tasks.
    pub max_workers: usize,
    /// Iteration ceiling when the plan does not set one.
    pub max_iterations: u32,
    /// Default per-task result limit.
    pub default_search_limit: usize,
    /// Synthesis context budget in characters.
    pub context_char_budget: usize,
    /// Per-item cap within the synthesis context, in characters.
    pub context_item_cap: usize,
    /// Recent conversation messages always included in analysis context.
    pub history_window: usize,
    /// Total cap on context entries (recent + relevant earlier).
    pub context_max_entries: usize,
    /// Queries at or below this length take the fast path unless they
    /// carry analytical keywords.
    pub fast_path_max_len: usize,
    pub force_full_path: bool,
    pub force_fast_path: bool,
    /// Ceiling on web fetch/search HTTP calls.
    pub web_timeout: Duration,
    /// Flat cost estimate per 1k tokens, all phases pooled.
    pub cost_per_1k_tokens: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            max_iterations: 3,
            default_search_limit: 10,
            context_char_budget: 40_000,
            context_item_cap: 2_000,
            history_window: 5,
            context_max_entries: 10,
            fast_path_max_len: 80,
            force_full_path: false,
            force_fast_path: false,
            web_timeout: Duration::from_secs(30),
            cost_per_1k_tokens: 0.002,
        }
    }
}

impl AgentConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `QUAERO_MAX_WORKERS` | `4` | Max concurrent worker tasks |
    /// | `QUAERO_MAX_ITERATIONS` | `3` | Iteration ceiling |
    /// | `QUAERO_CONTEXT_BUDGET` | `40000` | Synthesis context chars |
    /// | `QUAERO_FORCE_FAST_PATH` | `false` | Always take the fast path |
    /// | `QUAERO_FORCE_FULL_PATH` | `false` | Never take the fast path |
    /// | `QUAERO_WEB_TIMEOUT_SECS` | `30` | Web call ceiling |
    /// | `QUAERO_COST_PER_1K` | `0.002` | Cost estimate per 1k tokens |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let parse_usize = |key: &str, fallback: usize| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(fallback)
        };
        let parse_bool = |key: &str| {
            std::env::var(key)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false)
        };

        Self {
            max_workers: parse_usize("QUAERO_MAX_WORKERS", defaults.max_workers).max(1),
            max_iterations: std::env::var("QUAERO_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(defaults.max_iterations)
                .max(1),
            context_char_budget: parse_usize("QUAERO_CONTEXT_BUDGET", defaults.context_char_budget),
            force_fast_path: parse_bool("QUAERO_FORCE_FAST_PATH"),
            force_full_path: parse_bool("QUAERO_FORCE_FULL_PATH"),
            web_timeout: Duration::from_secs(
                std::env::var("QUAERO_WEB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(30),
            ),
            cost_per_1k_tokens: std::env::var("QUAERO_COST_PER_1K")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(defaults.cost_per_1k_tokens),
            ..defaults
        }
    }

    pub fn with_max_workers(mut self, max: usize) -> Self {
        self.max_workers = max.max(1);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_force_fast_path(mut self, force: bool) -> Self {
        self.force_fast_path = force;
        self
    }

    pub fn with_force_full_path(mut self, force: bool) -> Self {
        self.force_full_path = force;
        self
    }

    pub fn with_context_budget(mut self, chars: usize) -> Self {
        self.context_char_budget = chars;
        self
    }

    /// Snapshot for the trace's config field.
    pub fn snapshot(&self) -> Value {
        json!({
            "max_workers": self.max_workers,
            "max_iterations": self.max_iterations,
            "default_search_limit": self.default_search_limit,
            "context_char_budget": self.context_char_budget,
            "context_item_cap": self.context_item_cap,
            "fast_path_max_len": self.fast_path_max_len,
            "force_full_path": self.force_full_path,
            "force_fast_path": self.force_fast_path,
            "web_timeout_secs": self.web_timeout.as_secs(),
            "cost_per_1k_tokens": self.cost_per_1k_tokens,
        })
    }
}
