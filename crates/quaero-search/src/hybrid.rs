//! Hybrid search against a single data source.
//!
//! Issues vector-similarity and lexical queries against the same
//! underlying store and tags each hit with its search kind. Each kind
//! is fault-isolated: one kind failing degrades the call to the
//! surviving kind's results, logged but never raised.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument, warn};

use quaero_core::{DataSource, DocumentStore, SearchHit, SearchKind};

/// Retrieval mode for one search call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Vector,
    Lexical,
    Hybrid,
}

/// Candidate over-fetch factor per search kind. Fusion sees up to
/// `2 x limit` candidates from each kind.
pub const CANDIDATE_MULTIPLIER: usize = 2;

/// Hybrid search engine over one document store.
pub struct HybridSearchEngine {
    store: Arc<dyn DocumentStore>,
}

impl HybridSearchEngine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Search one source. Returns raw, kind-tagged hits; empty on an
    /// empty store or when every kind fails. Never errors.
    #[instrument(skip(self, embedding), fields(
        subsystem = "search",
        component = "hybrid_search",
        op = "search_source",
        source_id = %source.id,
        query = %query,
    ))]
    pub async fn search_source(
        &self,
        source: &DataSource,
        query: &str,
        embedding: Option<&[f32]>,
        limit: usize,
        mode: SearchMode,
    ) -> Vec<SearchHit> {
        let start = Instant::now();

        // An empty store short-circuits without issuing queries.
        match self.store.count(source).await {
            Ok(0) => {
                debug!(source_id = %source.id, "Source is empty, skipping");
                return Vec::new();
            }
            Ok(_) => {}
            Err(e) => {
                warn!(source_id = %source.id, error = %e, "Source count failed, skipping source");
                return Vec::new();
            }
        }

        let k = limit.saturating_mul(CANDIDATE_MULTIPLIER).max(1);
        let want_vector = mode != SearchMode::Lexical;
        let want_lexical = mode != SearchMode::Vector;

        // Both kinds run concurrently; each failure degrades to the
        // surviving kind's results.
        let (vector_hits, lexical_hits) = tokio::join!(
            self.vector_branch(source, embedding, k, want_vector),
            self.lexical_branch(source, query, k, want_lexical),
        );

        let mut hits = Vec::with_capacity(vector_hits.len() + lexical_hits.len());
        hits.extend(vector_hits);
        hits.extend(lexical_hits);

        debug!(
            source_id = %source.id,
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Hybrid retrieval complete"
        );

        hits
    }

    async fn vector_branch(
        &self,
        source: &DataSource,
        embedding: Option<&[f32]>,
        k: usize,
        enabled: bool,
    ) -> Vec<SearchHit> {
        if !enabled {
            return Vec::new();
        }
        let Some(embedding) = embedding else {
            debug!(source_id = %source.id, "No query embedding, vector search skipped");
            return Vec::new();
        };
        match self.store.vector_query(source, embedding, k).await {
            Ok(hits) => tag_kind(hits, SearchKind::Vector),
            Err(e) => {
                warn!(
                    source_id = %source.id,
                    error = %e,
                    "Vector search failed, degrading to lexical results"
                );
                Vec::new()
            }
        }
    }

    async fn lexical_branch(
        &self,
        source: &DataSource,
        query: &str,
        k: usize,
        enabled: bool,
    ) -> Vec<SearchHit> {
        if !enabled || query.trim().is_empty() {
            return Vec::new();
        }
        match self.store.lexical_query(source, query, k).await {
            Ok(hits) => tag_kind(hits, SearchKind::Lexical),
            Err(e) => {
                warn!(
                    source_id = %source.id,
                    error = %e,
                    "Lexical search failed, degrading to vector results"
                );
                Vec::new()
            }
        }
    }
}

/// The engine owns kind-tagging so store implementations don't have to.
fn tag_kind(hits: Vec<SearchHit>, kind: SearchKind) -> Vec<SearchHit> {
    hits.into_iter()
        .map(|mut hit| {
            hit.search_kind = kind;
            hit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quaero_core::{AccessKind, Error, Result, SourceKind};
    use serde_json::Value;

    struct FakeStore {
        count: u64,
        vector_fails: bool,
        lexical_fails: bool,
        count_fails: bool,
    }

    fn hit(id: &str) -> SearchHit {
        SearchHit {
            chunk_id: id.to_string(),
            parent_document_id: "p".to_string(),
            text: "text".to_string(),
            origin_score: 0.9,
            search_kind: SearchKind::Vector,
            metadata: Value::Null,
            source_title: None,
        }
    }

    #[async_trait]
    impl DocumentStore for FakeStore {
        async fn count(&self, _source: &DataSource) -> Result<u64> {
            if self.count_fails {
                return Err(Error::Store("unreachable".to_string()));
            }
            Ok(self.count)
        }

        async fn vector_query(
            &self,
            _source: &DataSource,
            _embedding: &[f32],
            _k: usize,
        ) -> Result<Vec<SearchHit>> {
            if self.vector_fails {
                return Err(Error::Store("vector index down".to_string()));
            }
            Ok(vec![hit("v1"), hit("v2")])
        }

        async fn lexical_query(
            &self,
            _source: &DataSource,
            _text: &str,
            _k: usize,
        ) -> Result<Vec<SearchHit>> {
            if self.lexical_fails {
                return Err(Error::Store("fts down".to_string()));
            }
            Ok(vec![hit("l1")])
        }
    }

    fn source() -> DataSource {
        DataSource {
            id: "personal:u1".to_string(),
            kind: SourceKind::Personal,
            store_handle: "personal_u1".to_string(),
            access: AccessKind::PrivateOwner,
            owner_id: Some("u1".to_string()),
            context_key: None,
            display_name: "Personal".to_string(),
        }
    }

    fn engine(store: FakeStore) -> HybridSearchEngine {
        HybridSearchEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_empty_store_short_circuits() {
        let engine = engine(FakeStore {
            count: 0,
            vector_fails: false,
            lexical_fails: false,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "query", Some(&[0.1]), 10, SearchMode::Hybrid)
            .await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_hybrid_tags_both_kinds() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: false,
            lexical_fails: false,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "query", Some(&[0.1]), 10, SearchMode::Hybrid)
            .await;
        assert_eq!(hits.len(), 3);
        assert_eq!(
            hits.iter()
                .filter(|h| h.search_kind == SearchKind::Vector)
                .count(),
            2
        );
        assert_eq!(
            hits.iter()
                .filter(|h| h.search_kind == SearchKind::Lexical)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_vector_failure_degrades_to_lexical() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: true,
            lexical_fails: false,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "query", Some(&[0.1]), 10, SearchMode::Hybrid)
            .await;
        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|h| h.search_kind == SearchKind::Lexical));
    }

    #[tokio::test]
    async fn test_lexical_failure_degrades_to_vector() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: false,
            lexical_fails: true,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "query", Some(&[0.1]), 10, SearchMode::Hybrid)
            .await;
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.search_kind == SearchKind::Vector));
    }

    #[tokio::test]
    async fn test_both_kinds_failing_yields_empty_not_error() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: true,
            lexical_fails: true,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "query", Some(&[0.1]), 10, SearchMode::Hybrid)
            .await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_count_failure_skips_source() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: false,
            lexical_fails: false,
            count_fails: true,
        });
        let hits = engine
            .search_source(&source(), "query", Some(&[0.1]), 10, SearchMode::Hybrid)
            .await;
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_missing_embedding_degrades_to_lexical_only() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: false,
            lexical_fails: false,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "query", None, 10, SearchMode::Hybrid)
            .await;
        assert_eq!(hits.len(), 1);
        assert!(hits.iter().all(|h| h.search_kind == SearchKind::Lexical));
    }

    #[tokio::test]
    async fn test_vector_mode_skips_lexical() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: false,
            lexical_fails: false,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "query", Some(&[0.1]), 10, SearchMode::Vector)
            .await;
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.search_kind == SearchKind::Vector));
    }

    #[tokio::test]
    async fn test_empty_query_skips_lexical() {
        let engine = engine(FakeStore {
            count: 5,
            vector_fails: false,
            lexical_fails: false,
            count_fails: false,
        });
        let hits = engine
            .search_source(&source(), "   ", Some(&[0.1]), 10, SearchMode::Hybrid)
            .await;
        assert!(hits.iter().all(|h| h.search_kind == SearchKind::Vector));
    }
}
