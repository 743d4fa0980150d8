//! Collaborator contracts.
//!
//! Everything the agent core talks to — the LLM, the document store,
//! the embedding service, web search/fetch, and the prompt template
//! store — sits behind one of these traits. Implementations live
//! outside the core (or in `quaero_agent::mock` for tests).

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DataSource, SearchHit, WebReference};

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// One completion request. `phase_hint` names the orchestration phase
/// for routing/observability; it carries no semantics in the core.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub phase_hint: String,
    pub expect_json: bool,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>, phase_hint: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            phase_hint: phase_hint.into(),
            expect_json: false,
            temperature: 0.2,
            max_output_tokens: 2048,
        }
    }

    pub fn expecting_json(mut self) -> Self {
        self.expect_json = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = max;
        self
    }
}

/// One completion response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub tokens_used: u32,
}

/// Black-box LLM call layer: prompt in, text out, token count.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion>;
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

/// Provider of ranked result records for one logical collection.
///
/// Both query methods return hits already sorted by origin relevance
/// descending; the `search_kind` on returned hits is set by the caller's
/// retrieval branch, so implementations may leave it at either value.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Number of indexed documents in the source. Zero short-circuits
    /// search without issuing queries.
    async fn count(&self, source: &DataSource) -> Result<u64>;

    /// ANN similarity query over embeddings.
    async fn vector_query(
        &self,
        source: &DataSource,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>>;

    /// Lexical/fuzzy full-text query.
    async fn lexical_query(
        &self,
        source: &DataSource,
        text: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>>;
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// Embedding provider with fixed dimensionality.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

// ---------------------------------------------------------------------------
// Web
// ---------------------------------------------------------------------------

/// External web search provider.
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<WebReference>>;
}

/// Raw page fetcher. Markup stripping is the core's job, not the fetcher's.
#[async_trait]
pub trait WebFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Prompt templates
// ---------------------------------------------------------------------------

/// External prompt template store. Callers fall back to compiled-in
/// defaults when a key is missing or the store is unavailable.
#[async_trait]
pub trait PromptStore: Send + Sync {
    async fn get_prompt(&self, key: &str) -> Result<String>;
}
