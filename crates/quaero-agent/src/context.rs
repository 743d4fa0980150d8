//! Conversation context selection for the analysis phase.
//!
//! The last N messages always ride along; earlier messages join only
//! when they share at least two significant words with the current
//! query, and the total is capped.

use std::collections::HashSet;

use quaero_core::ChatMessage;

/// Words shorter than this never count as significant.
pub const SIGNIFICANT_WORD_MIN_LEN: usize = 4;

/// Overlap threshold for pulling an earlier message into context.
pub const OVERLAP_THRESHOLD: usize = 2;

const STOPWORDS: &[&str] = &[
    "about", "after", "again", "also", "been", "before", "being", "between", "both", "could",
    "does", "doing", "down", "each", "from", "have", "having", "here", "into", "just", "more",
    "most", "once", "only", "other", "over", "same", "should", "show", "some", "something",
    "such", "tell", "than", "that", "their", "them", "then", "there", "these", "they", "this",
    "those", "through", "under", "until", "very", "what", "when", "where", "which", "while",
    "will", "with", "would", "your",
];

/// Lower-cased significant words of a text: long enough, not a stopword.
pub fn significant_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= SIGNIFICANT_WORD_MIN_LEN && !STOPWORDS.contains(w))
        .map(String::from)
        .collect()
}

/// Select conversation context for a query: the last `last_n` messages
/// plus earlier messages sharing at least [`OVERLAP_THRESHOLD`]
/// significant words with the query, capped to `max_entries` total
/// (earliest entries dropped first). Chronological order is preserved.
pub fn select_context(
    history: &[ChatMessage],
    query: &str,
    last_n: usize,
    max_entries: usize,
) -> Vec<ChatMessage> {
    if history.is_empty() || max_entries == 0 {
        return Vec::new();
    }

    let query_words = significant_words(query);
    let split = history.len().saturating_sub(last_n);
    let (earlier, recent) = history.split_at(split);

    let mut selected: Vec<ChatMessage> = earlier
        .iter()
        .filter(|msg| {
            let overlap = significant_words(&msg.content)
                .intersection(&query_words)
                .count();
            overlap >= OVERLAP_THRESHOLD
        })
        .cloned()
        .collect();
    selected.extend(recent.iter().cloned());

    if selected.len() > max_entries {
        selected.drain(..selected.len() - max_entries);
    }
    selected
}

/// Render context messages for prompt inclusion.
pub fn render_context(messages: &[ChatMessage]) -> String {
    if messages.is_empty() {
        return "(no prior conversation)".to_string();
    }
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}
