//! Federated search across multiple isolated data sources.
//!
//! All sources are queried concurrently with per-source failure
//! isolation: a failing source contributes zero results, never a fatal
//! error for the whole search. Per-source fusion runs before the
//! cross-source merge deduplicates and ranks globally.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{debug, info, instrument, warn};

use quaero_core::{DataSource, DocumentReference, DocumentStore, EmbeddingBackend, SearchHit};

use crate::fusion::{self, FusionConfig};
use crate::hybrid::{HybridSearchEngine, SearchMode};

/// Per-source fusion override. Strategies substitute their scoring
/// policy by handing a different fuser; the default applies
/// [`fusion::fuse`] with a [`FusionConfig`].
pub type Fuser = dyn Fn(&DataSource, Vec<SearchHit>, usize) -> Vec<DocumentReference> + Send + Sync;

/// Metadata about one federated search call.
#[derive(Debug, Clone)]
pub struct FederatedSearchReport {
    pub sources_queried: usize,
    pub sources_with_results: usize,
    /// (source id, fused hit count) per source, in input order.
    pub per_source_hits: Vec<(String, usize)>,
    pub duration_ms: u64,
}

/// Federated multi-source search engine.
pub struct FederatedSearchEngine {
    hybrid: HybridSearchEngine,
    embedder: Arc<dyn EmbeddingBackend>,
}

impl FederatedSearchEngine {
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn EmbeddingBackend>) -> Self {
        Self {
            hybrid: HybridSearchEngine::new(store),
            embedder,
        }
    }

    /// Search all sources with the default fusion policy.
    pub async fn search(
        &self,
        sources: &[DataSource],
        query: &str,
        limit: usize,
        mode: SearchMode,
        config: &FusionConfig,
    ) -> (Vec<DocumentReference>, FederatedSearchReport) {
        let config = config.clone();
        let fuser = move |source: &DataSource, hits: Vec<SearchHit>, limit: usize| {
            fusion::fuse(source, hits, limit, &config)
        };
        self.search_with(sources, query, limit, mode, &fuser).await
    }

    /// Search all sources with a custom per-source fuser.
    #[instrument(skip(self, sources, fuser), fields(
        subsystem = "search",
        component = "federated",
        op = "search",
        query = %query,
        source_count = sources.len(),
    ))]
    pub async fn search_with(
        &self,
        sources: &[DataSource],
        query: &str,
        limit: usize,
        mode: SearchMode,
        fuser: &Fuser,
    ) -> (Vec<DocumentReference>, FederatedSearchReport) {
        let start = Instant::now();

        // Embed the query once for all sources. Failure degrades the
        // whole call to lexical-only retrieval.
        let embedding = if mode == SearchMode::Lexical {
            None
        } else {
            match self.embedder.embed(query).await {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!(error = %e, "Query embedding failed, degrading to lexical-only");
                    None
                }
            }
        };

        let futures = sources.iter().map(|source| {
            let embedding = embedding.as_deref();
            async move {
                let hits = self
                    .hybrid
                    .search_source(source, query, embedding, limit, mode)
                    .await;
                let fused = fuser(source, hits, limit);
                debug!(
                    source_id = %source.id,
                    result_count = fused.len(),
                    "Source search complete"
                );
                (source.id.clone(), fused)
            }
        });
        let per_source: Vec<(String, Vec<DocumentReference>)> = join_all(futures).await;

        let per_source_hits: Vec<(String, usize)> = per_source
            .iter()
            .map(|(id, docs)| (id.clone(), docs.len()))
            .collect();
        let sources_with_results = per_source_hits.iter().filter(|(_, n)| *n > 0).count();

        let merged = fusion::merge_across_sources(
            per_source.into_iter().map(|(_, docs)| docs).collect(),
            limit,
        );

        let report = FederatedSearchReport {
            sources_queried: sources.len(),
            sources_with_results,
            per_source_hits,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            result_count = merged.len(),
            sources_with_results = report.sources_with_results,
            duration_ms = report.duration_ms,
            "Federated search completed"
        );

        (merged, report)
    }
}
