//! # quaero-search
//!
//! Hybrid search and rank fusion for the quaero agent: per-source
//! vector + lexical retrieval, Reciprocal Rank Fusion with quality
//! adjustments, federated multi-source merging, and result quality
//! assessment.

pub mod federated;
pub mod fusion;
pub mod hybrid;
pub mod quality;

pub use federated::{FederatedSearchEngine, FederatedSearchReport, Fuser};
pub use fusion::{
    fuse, merge_across_sources, FusionConfig, DEFAULT_RRF_K, NORMALIZED_FLOOR, TIE_FALLBACK_SCORE,
};
pub use hybrid::{HybridSearchEngine, SearchMode, CANDIDATE_MULTIPLIER};
pub use quality::{
    assess_results, assess_scores, refinement_suggestions, MAX_REFINEMENTS, NOMINAL_WEB_SCORE,
};
