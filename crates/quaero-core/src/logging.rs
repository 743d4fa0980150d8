//! Structured logging schema and field name constants for quaero.
//!
//! All crates use these constants for consistent structured logging
//! fields, so log aggregation tools can query by standardized names
//! across every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded request, structural faults (dependency cycles) |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Request lifecycle, phase completions |
//! | DEBUG | Decision points, intermediate values, exit checks |
//! | TRACE | Per-hit iteration, high-volume data |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Trace ID propagated across phases and worker tasks.
pub const TRACE_ID: &str = "trace_id";

/// Subsystem originating the log event.
/// Values: "search", "strategy", "scheduler", "coordinator"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "hybrid_search", "fusion", "worker_pool", "registry"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "search_source", "fuse", "execute", "process"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Data source ID being queried.
pub const SOURCE_ID: &str = "source_id";

/// Task ID being executed.
pub const TASK_ID: &str = "task_id";

/// Strategy ID in effect.
pub const STRATEGY_ID: &str = "strategy_id";

/// Search or task query text.
pub const QUERY: &str = "query";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or task.
pub const RESULT_COUNT: &str = "result_count";

/// Tokens consumed by an LLM call.
pub const TOKENS_USED: &str = "tokens_used";

/// Orchestration iteration number (1-based).
pub const ITERATION: &str = "iteration";

// ─── Search-specific fields ────────────────────────────────────────────────

/// Number of vector hits before fusion.
pub const VECTOR_HITS: &str = "vector_hits";

/// Number of lexical hits before fusion.
pub const LEXICAL_HITS: &str = "lexical_hits";

/// RRF k parameter.
pub const RRF_K: &str = "rrf_k";

/// Number of sources that produced at least one hit.
pub const SOURCES_WITH_RESULTS: &str = "sources_with_results";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
