//! # quaero-agent
//!
//! The orchestration layer of quaero: the coordinator state machine
//! (analyze → plan → execute → evaluate → synthesize, with a direct
//! fast path), the DAG-aware worker pool, per-task dispatch into the
//! search and web collaborators, bounded-context answer synthesis, and
//! deterministic mock collaborators for testing.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quaero_agent::config::AgentConfig;
//! use quaero_agent::coordinator::{Coordinator, RequestContext, RequestIdentity};
//! use quaero_agent::mock::{MockEmbedder, MockLlm, MockStore};
//! use quaero_strategy::StrategyRegistry;
//!
//! #[tokio::main]
//! async fn main() -> quaero_core::Result<()> {
//!     let coordinator = Coordinator::new(
//!         Arc::new(StrategyRegistry::with_defaults()),
//!         Arc::new(MockStore::new()),
//!         Arc::new(MockEmbedder::new()),
//!         Arc::new(MockLlm::new()),
//!         AgentConfig::from_env(),
//!     );
//!     let identity = RequestIdentity::new("u1", Some("user@example.com".to_string()));
//!     let (answer, trace) = coordinator
//!         .process("where is the deploy runbook", &identity, &RequestContext::default())
//!         .await?;
//!     println!("{answer} ({} documents)", trace.documents.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod context;
pub mod coordinator;
pub mod evaluator;
pub mod llm_json;
pub mod mock;
pub mod planner;
pub mod scheduler;
pub mod synthesis;
pub mod tasks;
pub mod web;

pub use config::AgentConfig;
pub use coordinator::{Coordinator, RequestContext, RequestIdentity};
pub use scheduler::{execute_tasks, CompletionCallback};
pub use synthesis::{SynthesisResult, NO_RESULTS_ANSWER};
pub use tasks::TaskRuntime;
pub use web::{strip_html, HttpFetcher};
