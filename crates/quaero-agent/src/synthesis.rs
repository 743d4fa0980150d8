//! Answer synthesis: pack the best evidence into a bounded context and
//! ask the LLM for a cited answer, with deterministic fallbacks.

use tracing::warn;

use quaero_core::{CompletionRequest, DocumentReference, LlmBackend, PromptStore, WebReference};
use quaero_strategy::{prompts, Phase, Strategy};

use crate::config::AgentConfig;

/// Fixed answer when the whole request discovered nothing. Never an
/// empty string.
pub const NO_RESULTS_ANSWER: &str =
    "No relevant information was found in the available sources for this question.";

/// Items used in the templated fallback answer.
const FALLBACK_TOP_ITEMS: usize = 5;

/// Synthesis outcome.
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub answer: String,
    pub tokens_used: u32,
    /// True when the answer came from a deterministic fallback instead
    /// of the LLM.
    pub from_fallback: bool,
}

/// One packed context entry, kept for citation mapping.
struct PackedItem {
    label: String,
    body: String,
}

/// Greedily pack documents (score order) then web links into the
/// character budget, each item capped. Returns the rendered context and
/// the number of items packed.
pub fn pack_context(
    documents: &[DocumentReference],
    links: &[WebReference],
    char_budget: usize,
    item_cap: usize,
) -> (String, usize) {
    let mut ranked: Vec<&DocumentReference> = documents.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut items: Vec<PackedItem> = Vec::new();
    let mut used = 0usize;

    for doc in ranked {
        let body = doc
            .full_text
            .as_deref()
            .unwrap_or(doc.excerpt.as_str())
            .chars()
            .take(item_cap)
            .collect::<String>();
        let label = format!("{} ({})", doc.title, doc.source_id);
        if !try_pack(&mut items, &mut used, char_budget, label, body) {
            break;
        }
    }
    if used < char_budget {
        for link in links {
            let body = link
                .full_text
                .as_deref()
                .unwrap_or(link.excerpt.as_str())
                .chars()
                .take(item_cap)
                .collect::<String>();
            let label = format!("{} ({})", link.title, link.url);
            if !try_pack(&mut items, &mut used, char_budget, label, body) {
                break;
            }
        }
    }

    let rendered = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("[{}] {}\n{}", i + 1, item.label, item.body))
        .collect::<Vec<_>>()
        .join("\n\n");
    (rendered, items.len())
}

fn try_pack(
    items: &mut Vec<PackedItem>,
    used: &mut usize,
    budget: usize,
    label: String,
    body: String,
) -> bool {
    let cost = label.chars().count() + body.chars().count() + 8;
    if *used + cost > budget {
        return false;
    }
    *used += cost;
    items.push(PackedItem { label, body });
    true
}

/// Run the SYNTHESIZE (or fast-path) phase. Never fails and never
/// returns an empty answer: an LLM failure or blank output falls back
/// to a deterministic template over the top packed items, and a fully
/// empty evidence set yields [`NO_RESULTS_ANSWER`].
pub async fn synthesize(
    llm: &dyn LlmBackend,
    strategy: &dyn Strategy,
    prompt_store: Option<&dyn PromptStore>,
    query: &str,
    documents: &[DocumentReference],
    links: &[WebReference],
    config: &AgentConfig,
    phase: Phase,
) -> SynthesisResult {
    if documents.is_empty() && links.is_empty() {
        return SynthesisResult {
            answer: NO_RESULTS_ANSWER.to_string(),
            tokens_used: 0,
            from_fallback: true,
        };
    }

    let (context, packed) = pack_context(
        documents,
        links,
        config.context_char_budget,
        config.context_item_cap,
    );
    let template =
        prompts::resolve_prompt(prompt_store, phase, &strategy.prompt_for(phase)).await;
    let prompt = prompts::render(&template, &[("query", query), ("context", &context)]);

    match llm
        .complete(
            CompletionRequest::new(prompt, phase.as_str()).with_max_output_tokens(4096),
        )
        .await
    {
        Ok(completion) if !completion.text.trim().is_empty() => SynthesisResult {
            answer: completion.text.trim().to_string(),
            tokens_used: completion.tokens_used,
            from_fallback: false,
        },
        Ok(completion) => {
            warn!(packed, "Empty synthesis response, using fallback answer");
            SynthesisResult {
                answer: fallback_answer(query, documents, links),
                tokens_used: completion.tokens_used,
                from_fallback: true,
            }
        }
        Err(e) => {
            warn!(error = %e, "Synthesis failed, using fallback answer");
            SynthesisResult {
                answer: fallback_answer(query, documents, links),
                tokens_used: 0,
                from_fallback: true,
            }
        }
    }
}

/// Deterministic answer template from the top-scored items.
pub fn fallback_answer(
    query: &str,
    documents: &[DocumentReference],
    links: &[WebReference],
) -> String {
    let mut ranked: Vec<&DocumentReference> = documents.iter().collect();
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut lines: Vec<String> = Vec::new();
    for doc in ranked.iter().take(FALLBACK_TOP_ITEMS) {
        let excerpt: String = doc.excerpt.chars().take(200).collect();
        lines.push(format!("- {}: {}", doc.title, excerpt));
    }
    for link in links.iter().take(FALLBACK_TOP_ITEMS.saturating_sub(lines.len())) {
        let excerpt: String = link.excerpt.chars().take(200).collect();
        lines.push(format!("- {} ({}): {}", link.title, link.url, excerpt));
    }

    format!(
        "The most relevant material found for \"{query}\":\n\n{}",
        lines.join("\n")
    )
}
