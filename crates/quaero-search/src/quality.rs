//! Result quality assessment and refinement heuristics.

use quaero_core::{DocumentReference, ResultQuality, TaskKind};

/// Score assumed for a web reference, which carries no fused score.
/// Sits between the partial and good thresholds so web-only results
/// need volume to rate well.
pub const NOMINAL_WEB_SCORE: f32 = 0.6;

/// Maximum refinement suggestions attached to one task result.
pub const MAX_REFINEMENTS: usize = 3;

/// Bucket a score list: >=5 hits with mean > 0.8 is excellent, >=3
/// with mean > 0.5 is good, >=1 is partial, else empty.
pub fn assess_scores(scores: &[f32]) -> ResultQuality {
    if scores.is_empty() {
        return ResultQuality::Empty;
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    if scores.len() >= 5 && mean > 0.8 {
        ResultQuality::Excellent
    } else if scores.len() >= 3 && mean > 0.5 {
        ResultQuality::Good
    } else {
        ResultQuality::Partial
    }
}

/// Assess a task's combined document + web results.
pub fn assess_results(documents: &[DocumentReference], web_ref_count: usize) -> ResultQuality {
    let mut scores: Vec<f32> = documents.iter().map(|d| d.score).collect();
    scores.extend(std::iter::repeat(NOMINAL_WEB_SCORE).take(web_ref_count));
    assess_scores(&scores)
}

/// Small synonym table for query refinement suggestions.
const SYNONYMS: &[(&str, &str)] = &[
    ("error", "failure"),
    ("issue", "problem"),
    ("guide", "tutorial"),
    ("setup", "configuration"),
    ("delete", "remove"),
    ("policy", "guideline"),
    ("fix", "resolve"),
    ("docs", "documentation"),
];

/// Up to [`MAX_REFINEMENTS`] heuristic suggestions for a below-good
/// result: a synonym-substituted query variant, broadening to all
/// sources, and falling back to the web.
pub fn refinement_suggestions(
    query: &str,
    kind: TaskKind,
    quality: ResultQuality,
) -> Vec<String> {
    if quality >= ResultQuality::Good {
        return Vec::new();
    }

    let mut suggestions = Vec::new();

    if let Some(variant) = synonym_variant(query) {
        suggestions.push(format!("retry with synonyms: {variant}"));
    }
    if kind.is_store_search() && kind != TaskKind::SearchAll {
        suggestions.push("broaden the search to all document sources".to_string());
    }
    if kind != TaskKind::WebSearch {
        suggestions.push("try a web search for recent or external information".to_string());
    }

    suggestions.truncate(MAX_REFINEMENTS);
    suggestions
}

/// Substitute the first query word found in the synonym table.
fn synonym_variant(query: &str) -> Option<String> {
    let lower = query.to_lowercase();
    for (word, synonym) in SYNONYMS {
        if lower.split_whitespace().any(|w| w == *word) {
            let replaced: Vec<String> = query
                .split_whitespace()
                .map(|w| {
                    if w.to_lowercase() == *word {
                        (*synonym).to_string()
                    } else {
                        w.to_string()
                    }
                })
                .collect();
            return Some(replaced.join(" "));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_scores() {
        assert_eq!(assess_scores(&[]), ResultQuality::Empty);
    }

    #[test]
    fn test_single_hit_is_partial() {
        assert_eq!(assess_scores(&[0.95]), ResultQuality::Partial);
    }

    #[test]
    fn test_good_threshold() {
        assert_eq!(assess_scores(&[0.6, 0.6, 0.6]), ResultQuality::Good);
        // Three hits with low mean stay partial.
        assert_eq!(assess_scores(&[0.3, 0.3, 0.3]), ResultQuality::Partial);
    }

    #[test]
    fn test_excellent_threshold() {
        assert_eq!(
            assess_scores(&[0.9, 0.9, 0.85, 0.85, 0.9]),
            ResultQuality::Excellent
        );
        // Five hits with a mediocre mean are merely good.
        assert_eq!(
            assess_scores(&[0.6, 0.6, 0.6, 0.6, 0.6]),
            ResultQuality::Good
        );
    }

    #[test]
    fn test_four_high_hits_are_good_not_excellent() {
        assert_eq!(assess_scores(&[0.9, 0.9, 0.9, 0.9]), ResultQuality::Good);
    }

    #[test]
    fn test_web_refs_count_at_nominal_score() {
        // Five web refs at 0.6 mean: good, not excellent.
        assert_eq!(assess_results(&[], 5), ResultQuality::Good);
        assert_eq!(assess_results(&[], 1), ResultQuality::Partial);
        assert_eq!(assess_results(&[], 0), ResultQuality::Empty);
    }

    #[test]
    fn test_no_suggestions_at_good_or_better() {
        assert!(refinement_suggestions("query", TaskKind::SearchAll, ResultQuality::Good)
            .is_empty());
        assert!(refinement_suggestions(
            "query",
            TaskKind::SearchAll,
            ResultQuality::Excellent
        )
        .is_empty());
    }

    #[test]
    fn test_suggestions_capped_at_three() {
        let suggestions = refinement_suggestions(
            "fix the setup error",
            TaskKind::SearchOrg,
            ResultQuality::Partial,
        );
        assert!(suggestions.len() <= MAX_REFINEMENTS);
        assert!(!suggestions.is_empty());
    }

    #[test]
    fn test_synonym_substitution() {
        let suggestions =
            refinement_suggestions("database error logs", TaskKind::SearchAll, ResultQuality::Empty);
        assert!(suggestions
            .iter()
            .any(|s| s.contains("database failure logs")));
    }

    #[test]
    fn test_scoped_search_suggests_broadening() {
        let suggestions =
            refinement_suggestions("anything", TaskKind::SearchPersonal, ResultQuality::Empty);
        assert!(suggestions.iter().any(|s| s.contains("all document sources")));
        // SearchAll can't broaden further.
        let suggestions =
            refinement_suggestions("anything", TaskKind::SearchAll, ResultQuality::Empty);
        assert!(!suggestions.iter().any(|s| s.contains("all document sources")));
    }

    #[test]
    fn test_web_search_does_not_suggest_web() {
        let suggestions =
            refinement_suggestions("anything", TaskKind::WebSearch, ResultQuality::Empty);
        assert!(!suggestions.iter().any(|s| s.contains("web search")));
    }
}
