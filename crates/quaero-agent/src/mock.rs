//! Mock collaborators for deterministic testing.
//!
//! Provides scripted implementations of every collaborator trait:
//! an LLM that answers by phase or prompt substring, an in-memory
//! document store with deterministic scoring, a canned web provider
//! and fetcher, and a character-hash embedder. All support failure
//! injection and call logging for assertions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use quaero_core::{
    Completion, CompletionRequest, DataSource, DocumentStore, EmbeddingBackend, Error, LlmBackend,
    PromptStore, Result, SearchHit, SearchKind, WebFetcher, WebReference, WebSearchProvider,
};

// ---------------------------------------------------------------------------
// LLM
// ---------------------------------------------------------------------------

/// Scripted LLM backend. Responses are matched first by phase hint,
/// then by prompt substring, then the default response.
#[derive(Clone)]
pub struct MockLlm {
    responses: Arc<Vec<(String, String)>>,
    default_response: String,
    fail: bool,
    failure_rate: f64,
    empty: bool,
    latency: Duration,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Vec::new()),
            default_response: "Mock response".to_string(),
            fail: false,
            failure_rate: 0.0,
            empty: false,
            latency: Duration::ZERO,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Respond with `response` when the phase hint equals `matcher` or
    /// the prompt contains it. Earlier mappings win.
    pub fn with_response(mut self, matcher: impl Into<String>, response: impl Into<String>) -> Self {
        let mut responses = (*self.responses).clone();
        responses.push((matcher.into(), response.into()));
        self.responses = Arc::new(responses);
        self
    }

    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = response.into();
        self
    }

    /// Every call fails.
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Fraction of calls (0.0 - 1.0) that fail, for resilience tests.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        self.failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Every call returns whitespace-only text.
    pub fn with_empty_responses(mut self) -> Self {
        self.empty = true;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Phase hints of every call made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, phase: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == phase).count()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmBackend for MockLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion> {
        self.calls.lock().unwrap().push(request.phase_hint.clone());
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail {
            return Err(Error::Inference("simulated LLM failure".to_string()));
        }
        if self.failure_rate > 0.0 {
            use rand::Rng;
            if rand::thread_rng().gen::<f64>() < self.failure_rate {
                return Err(Error::Inference("simulated LLM failure".to_string()));
            }
        }
        if self.empty {
            return Ok(Completion {
                text: "   ".to_string(),
                tokens_used: 0,
            });
        }
        let text = self
            .responses
            .iter()
            .find(|(matcher, _)| {
                request.phase_hint == *matcher || request.prompt.contains(matcher.as_str())
            })
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default_response.clone());
        // Deterministic token accounting: 4 chars per token.
        let tokens_used = ((request.prompt.len() + text.len()) / 4) as u32;
        Ok(Completion { text, tokens_used })
    }
}

// ---------------------------------------------------------------------------
// Document store
// ---------------------------------------------------------------------------

/// One indexed chunk in the mock store.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub chunk_id: String,
    pub parent_document_id: String,
    pub title: Option<String>,
    pub text: String,
    /// Vector similarity this chunk reports for any query.
    pub score: f32,
}

impl StoredChunk {
    pub fn new(chunk_id: &str, text: &str, score: f32) -> Self {
        Self {
            chunk_id: chunk_id.to_string(),
            parent_document_id: format!("doc-{chunk_id}"),
            title: Some(format!("Title {chunk_id}")),
            text: text.to_string(),
            score,
        }
    }
}

/// In-memory document store keyed by store handle, with deterministic
/// vector and lexical scoring.
pub struct MockStore {
    chunks: Mutex<HashMap<String, Vec<StoredChunk>>>,
    failing: Mutex<HashSet<String>>,
    latency: Duration,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Index a chunk under a store handle.
    pub fn add_chunk(&self, store_handle: &str, chunk: StoredChunk) {
        self.chunks
            .lock()
            .unwrap()
            .entry(store_handle.to_string())
            .or_default()
            .push(chunk);
    }

    /// Make every query against a handle fail.
    pub fn fail_handle(&self, store_handle: &str) {
        self.failing.lock().unwrap().insert(store_handle.to_string());
    }

    fn chunks_for(&self, handle: &str) -> Vec<StoredChunk> {
        self.chunks
            .lock()
            .unwrap()
            .get(handle)
            .cloned()
            .unwrap_or_default()
    }

    fn check_failure(&self, source: &DataSource) -> Result<()> {
        if self.failing.lock().unwrap().contains(&source.store_handle) {
            return Err(Error::Store(format!(
                "simulated failure for {}",
                source.store_handle
            )));
        }
        Ok(())
    }

    fn to_hit(chunk: &StoredChunk, origin_score: f32) -> SearchHit {
        SearchHit {
            chunk_id: chunk.chunk_id.clone(),
            parent_document_id: chunk.parent_document_id.clone(),
            text: chunk.text.clone(),
            origin_score,
            search_kind: SearchKind::Vector,
            metadata: Value::Null,
            source_title: chunk.title.clone(),
        }
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn count(&self, source: &DataSource) -> Result<u64> {
        self.check_failure(source)?;
        Ok(self.chunks_for(&source.store_handle).len() as u64)
    }

    async fn vector_query(
        &self,
        source: &DataSource,
        _embedding: &[f32],
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.check_failure(source)?;
        let mut chunks = self.chunks_for(&source.store_handle);
        chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        chunks.truncate(k);
        Ok(chunks.iter().map(|c| Self::to_hit(c, c.score)).collect())
    }

    async fn lexical_query(
        &self,
        source: &DataSource,
        text: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.check_failure(source)?;
        let words: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        let mut matched: Vec<(StoredChunk, f32)> = self
            .chunks_for(&source.store_handle)
            .into_iter()
            .filter_map(|chunk| {
                let lower = chunk.text.to_lowercase();
                let overlap = words.iter().filter(|w| lower.contains(w.as_str())).count();
                if overlap == 0 || words.is_empty() {
                    None
                } else {
                    let score = overlap as f32 / words.len() as f32;
                    Some((chunk, score))
                }
            })
            .collect();
        matched.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        matched.truncate(k);
        Ok(matched
            .iter()
            .map(|(chunk, score)| Self::to_hit(chunk, *score))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

/// Deterministic character-hash embedder: the same text always yields
/// the same unit vector.
pub struct MockEmbedder {
    dimension: usize,
    fail: bool,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self {
            dimension: 1536,
            fail: false,
        }
    }

    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Deterministic embedding from character codes, normalized.
    pub fn generate(text: &str, dimension: usize) -> Vec<f32> {
        let mut vec = vec![0.0f32; dimension];
        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % dimension;
            vec[idx] += 0.1;
        }
        let magnitude: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vec.iter_mut().for_each(|x| *x /= magnitude);
        }
        vec
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for MockEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if self.fail {
            return Err(Error::Embedding("simulated embedding failure".to_string()));
        }
        Ok(Self::generate(text, self.dimension))
    }
}

// ---------------------------------------------------------------------------
// Web
// ---------------------------------------------------------------------------

/// Canned web search provider.
pub struct MockWebProvider {
    results: Vec<WebReference>,
    fail: bool,
}

impl MockWebProvider {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            fail: false,
        }
    }

    pub fn with_result(mut self, url: &str, title: &str, excerpt: &str) -> Self {
        self.results.push(WebReference {
            url: url.to_string(),
            title: title.to_string(),
            excerpt: excerpt.to_string(),
            full_text: None,
            query: String::new(),
        });
        self
    }

    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl Default for MockWebProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebSearchProvider for MockWebProvider {
    async fn search(&self, query: &str, count: usize) -> Result<Vec<WebReference>> {
        if self.fail {
            return Err(Error::Request("simulated web search failure".to_string()));
        }
        Ok(self
            .results
            .iter()
            .take(count)
            .map(|r| WebReference {
                query: query.to_string(),
                ..r.clone()
            })
            .collect())
    }
}

/// Canned page fetcher keyed by URL.
pub struct MockWebFetcher {
    pages: HashMap<String, String>,
}

impl MockWebFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

impl Default for MockWebFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebFetcher for MockWebFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| Error::Request(format!("simulated fetch failure for {url}")))
    }
}

/// Prompt store with fixed templates by key.
pub struct MockPromptStore {
    templates: HashMap<String, String>,
}

impl MockPromptStore {
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn with_template(mut self, key: &str, template: &str) -> Self {
        self.templates.insert(key.to_string(), template.to_string());
        self
    }
}

impl Default for MockPromptStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PromptStore for MockPromptStore {
    async fn get_prompt(&self, key: &str) -> Result<String> {
        self.templates
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("prompt '{key}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quaero_core::{AccessKind, SourceKind};

    fn source(handle: &str) -> DataSource {
        DataSource {
            id: format!("src:{handle}"),
            kind: SourceKind::Personal,
            store_handle: handle.to_string(),
            access: AccessKind::PrivateOwner,
            owner_id: None,
            context_key: None,
            display_name: handle.to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_llm_phase_matching() {
        let llm = MockLlm::new()
            .with_response("analyze", r#"{"intent_summary": "x"}"#)
            .with_default_response("fallback");

        let completion = llm
            .complete(CompletionRequest::new("prompt", "analyze"))
            .await
            .unwrap();
        assert!(completion.text.contains("intent_summary"));

        let completion = llm
            .complete(CompletionRequest::new("prompt", "other"))
            .await
            .unwrap();
        assert_eq!(completion.text, "fallback");
        assert_eq!(llm.call_count(), 2);
        assert_eq!(llm.calls_for("analyze"), 1);
    }

    #[tokio::test]
    async fn test_mock_llm_prompt_substring_matching() {
        let llm = MockLlm::new().with_response("MAGIC-TOKEN", "matched");
        let completion = llm
            .complete(CompletionRequest::new("contains MAGIC-TOKEN here", "any"))
            .await
            .unwrap();
        assert_eq!(completion.text, "matched");
    }

    #[tokio::test]
    async fn test_mock_llm_failure() {
        let llm = MockLlm::new().with_failure();
        assert!(llm
            .complete(CompletionRequest::new("p", "analyze"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_mock_store_vector_sorted_desc() {
        let store = MockStore::new();
        store.add_chunk("h", StoredChunk::new("low", "text", 0.3));
        store.add_chunk("h", StoredChunk::new("high", "text", 0.9));

        let hits = store.vector_query(&source("h"), &[0.0], 10).await.unwrap();
        assert_eq!(hits[0].chunk_id, "high");
        assert_eq!(hits[1].chunk_id, "low");
    }

    #[tokio::test]
    async fn test_mock_store_lexical_overlap() {
        let store = MockStore::new();
        store.add_chunk("h", StoredChunk::new("a", "rust async runtime internals", 0.5));
        store.add_chunk("h", StoredChunk::new("b", "gardening tips", 0.5));

        let hits = store
            .lexical_query(&source("h"), "rust runtime", 10)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "a");
        assert!((hits[0].origin_score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_mock_store_failure_injection() {
        let store = MockStore::new();
        store.add_chunk("h", StoredChunk::new("a", "text", 0.5));
        store.fail_handle("h");
        assert!(store.count(&source("h")).await.is_err());
        assert!(store.vector_query(&source("h"), &[0.0], 10).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_embedder_deterministic() {
        let embedder = MockEmbedder::new().with_dimension(64);
        let a = embedder.embed("same text").await.unwrap();
        let b = embedder.embed("same text").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let magnitude: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_mock_web_provider_tags_query() {
        let provider = MockWebProvider::new().with_result("https://a", "A", "excerpt");
        let results = provider.search("my query", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].query, "my query");
    }

    #[tokio::test]
    async fn test_mock_fetcher_unknown_url_fails() {
        let fetcher = MockWebFetcher::new().with_page("https://known", "<p>hi</p>");
        assert!(fetcher.fetch("https://known").await.is_ok());
        assert!(fetcher.fetch("https://unknown").await.is_err());
    }
}
