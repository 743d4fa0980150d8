//! Reciprocal Rank Fusion with quality adjustments.
//!
//! RRF is rank-based, so it stays robust when vector cosine scores and
//! lexical relevance scores live on incomparable scales. Two known RRF
//! weaknesses are corrected by multiplicative adjustments: it ignores
//! absolute confidence (cross-match boost) and it ignores content
//! substance (length penalties/bonus).

use std::collections::HashMap;

use tracing::debug;

use quaero_core::{DataSource, DocumentReference, SearchHit, SearchKind};

/// RRF smoothing constant. K=60 is the classic Cormack et al. (2009)
/// default; higher k reduces the influence of top ranks from any
/// single list.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Floor of the normalized score band.
pub const NORMALIZED_FLOOR: f32 = 0.5;

/// Score assigned when all adjusted scores tie and a chunk has no
/// vector component to fall back on.
pub const TIE_FALLBACK_SCORE: f32 = 0.75;

/// Tunables for the fusion scoring policy. Strategies substitute their
/// own adjustments by handing a different config; the rank/RRF core and
/// the final sort stay shared.
#[derive(Debug, Clone)]
pub struct FusionConfig {
    pub rrf_k: f32,
    /// Multiplier for chunks found by both search kinds.
    pub cross_match_boost: f32,
    /// Content below this length takes the hardest penalty; the ladder
    /// steps at 2x and 4x this threshold.
    pub min_content_length: usize,
    pub short_penalty: f32,
    pub mid_penalty: f32,
    pub soft_penalty: f32,
    /// Content longer than this earns the substance bonus.
    pub long_content_threshold: usize,
    pub long_content_bonus: f32,
    /// Domain keyword bonus: chunks containing any keyword get the boost.
    pub keywords: Vec<String>,
    pub keyword_boost: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            cross_match_boost: 1.15,
            min_content_length: 50,
            short_penalty: 0.5,
            mid_penalty: 0.7,
            soft_penalty: 0.85,
            long_content_threshold: 500,
            long_content_bonus: 1.05,
            keywords: Vec::new(),
            keyword_boost: 1.0,
        }
    }
}

impl FusionConfig {
    pub fn with_rrf_k(mut self, k: f32) -> Self {
        self.rrf_k = k;
        self
    }

    pub fn with_cross_match_boost(mut self, boost: f32) -> Self {
        self.cross_match_boost = boost;
        self
    }

    pub fn with_min_content_length(mut self, len: usize) -> Self {
        self.min_content_length = len;
        self
    }

    pub fn with_keywords(mut self, keywords: Vec<String>, boost: f32) -> Self {
        self.keywords = keywords;
        self.keyword_boost = boost;
        self
    }

    /// Length adjustment ladder: hardest below the minimum, easing at
    /// 2x and 4x, bonus above the substance threshold.
    fn length_factor(&self, len: usize) -> f32 {
        if len < self.min_content_length {
            self.short_penalty
        } else if len < self.min_content_length * 2 {
            self.mid_penalty
        } else if len < self.min_content_length * 4 {
            self.soft_penalty
        } else if len > self.long_content_threshold {
            self.long_content_bonus
        } else {
            1.0
        }
    }

    fn keyword_factor(&self, text: &str) -> f32 {
        if self.keywords.is_empty() {
            return 1.0;
        }
        let lower = text.to_lowercase();
        if self.keywords.iter().any(|kw| lower.contains(kw.as_str())) {
            self.keyword_boost
        } else {
            1.0
        }
    }
}

/// Per-chunk aggregation state during fusion.
struct ChunkAgg {
    hit: SearchHit,
    rrf: f32,
    vector_similarity: Option<f32>,
    saw_vector: bool,
    saw_lexical: bool,
}

/// Fuse one source's vector + lexical hit lists into ranked document
/// references.
///
/// Steps: partition by search kind, accumulate 0-based-rank RRF scores,
/// apply the config's multiplicative adjustments, min-max normalize
/// into `[0.5, 1.0]` (zero range falls back to the original vector
/// similarity, else [`TIE_FALLBACK_SCORE`]), sort descending, truncate.
/// Metadata from a chunk's first occurrence wins.
pub fn fuse(
    source: &DataSource,
    hits: Vec<SearchHit>,
    limit: usize,
    config: &FusionConfig,
) -> Vec<DocumentReference> {
    if hits.is_empty() || limit == 0 {
        return Vec::new();
    }

    // Insertion-ordered aggregation keeps fusion deterministic.
    let mut order: Vec<String> = Vec::new();
    let mut aggs: HashMap<String, ChunkAgg> = HashMap::new();
    let mut vector_rank = 0usize;
    let mut lexical_rank = 0usize;

    for hit in hits {
        // Input lists arrive sorted by origin relevance, so the running
        // per-kind counter is the 0-based rank within that kind.
        let rank = match hit.search_kind {
            SearchKind::Vector => {
                let r = vector_rank;
                vector_rank += 1;
                r
            }
            SearchKind::Lexical => {
                let r = lexical_rank;
                lexical_rank += 1;
                r
            }
        };
        let rrf = 1.0 / (config.rrf_k + rank as f32);

        let agg = aggs.entry(hit.chunk_id.clone()).or_insert_with(|| {
            order.push(hit.chunk_id.clone());
            ChunkAgg {
                hit: hit.clone(),
                rrf: 0.0,
                vector_similarity: None,
                saw_vector: false,
                saw_lexical: false,
            }
        });
        agg.rrf += rrf;
        match hit.search_kind {
            SearchKind::Vector => {
                agg.saw_vector = true;
                agg.vector_similarity.get_or_insert(hit.origin_score);
            }
            SearchKind::Lexical => agg.saw_lexical = true,
        }
    }

    // Adjustments, multiplicative, in order: cross-match boost,
    // length penalty/bonus, domain keyword bonus.
    let mut scored: Vec<(String, f32)> = Vec::with_capacity(order.len());
    for id in &order {
        let agg = &aggs[id];
        let mut score = agg.rrf;
        if agg.saw_vector && agg.saw_lexical {
            score *= config.cross_match_boost;
        }
        score *= config.length_factor(agg.hit.text.chars().count());
        score *= config.keyword_factor(&agg.hit.text);
        scored.push((id.clone(), score));
    }

    // Min-max normalize into [0.5, 1.0].
    let min = scored.iter().map(|(_, s)| *s).fold(f32::INFINITY, f32::min);
    let max = scored
        .iter()
        .map(|(_, s)| *s)
        .fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;

    let mut results: Vec<DocumentReference> = scored
        .into_iter()
        .map(|(id, score)| {
            let agg = &aggs[&id];
            let final_score = if range > 0.0 {
                NORMALIZED_FLOOR + (1.0 - NORMALIZED_FLOOR) * (score - min) / range
            } else {
                agg.vector_similarity
                    .map(|s| s.clamp(0.0, 1.0))
                    .unwrap_or(TIE_FALLBACK_SCORE)
            };
            to_reference(source, &agg.hit, final_score)
        })
        .collect();

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results.truncate(limit);

    debug!(
        source_id = %source.id,
        rrf_k = config.rrf_k,
        result_count = results.len(),
        "Fusion complete"
    );

    results
}

fn to_reference(source: &DataSource, hit: &SearchHit, score: f32) -> DocumentReference {
    DocumentReference {
        chunk_id: hit.chunk_id.clone(),
        parent_document_id: hit.parent_document_id.clone(),
        // Partial documents are never dropped; missing titles get a placeholder.
        title: hit
            .source_title
            .clone()
            .unwrap_or_else(|| "Untitled document".to_string()),
        source_kind: source.kind,
        source_id: source.id.clone(),
        excerpt: DocumentReference::make_excerpt(&hit.text),
        full_text: None,
        score,
        metadata: hit.metadata.clone(),
    }
}

/// Merge per-source fused lists into one globally ranked list:
/// deduplicate by chunk id (first occurrence wins), sort by fused score
/// descending, truncate to the overall limit.
pub fn merge_across_sources(
    per_source: Vec<Vec<DocumentReference>>,
    limit: usize,
) -> Vec<DocumentReference> {
    let mut seen: HashMap<String, ()> = HashMap::new();
    let mut merged: Vec<DocumentReference> = Vec::new();
    for docs in per_source {
        for doc in docs {
            if seen.insert(doc.chunk_id.clone(), ()).is_none() {
                merged.push(doc);
            }
        }
    }
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(limit);
    merged
}
