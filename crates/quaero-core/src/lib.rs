//! # quaero-core
//!
//! Core types, traits, and abstractions for the quaero agent.
//!
//! This crate provides the shared data model, the collaborator
//! contracts (LLM, document store, embeddings, web, prompt templates),
//! per-request data source resolution, and the progress event bus that
//! the other quaero crates build on.

pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod sources;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{AgentEvent, EventBus};
pub use models::*;
pub use sources::{email_slug, resolve_sources, ActiveContext};
pub use traits::{
    Completion, CompletionRequest, DocumentStore, EmbeddingBackend, LlmBackend, PromptStore,
    WebFetcher, WebSearchProvider,
};
