//! Compiled-in default prompt templates.
//!
//! Templates use `{placeholder}` substitution performed by the caller.
//! An external prompt store may override any template by key; callers
//! fall back to these defaults when the store is missing a key or
//! unavailable.

use quaero_core::PromptStore;
use tracing::debug;

use crate::Phase;

/// Prompt store key for a phase.
pub fn prompt_key(phase: Phase) -> &'static str {
    match phase {
        Phase::Analyze => "agent.analyze",
        Phase::Plan => "agent.plan",
        Phase::Evaluate => "agent.evaluate",
        Phase::Synthesize => "agent.synthesize",
        Phase::FastResponse => "agent.fast_response",
    }
}

/// Compiled-in default template for a phase.
pub fn default_prompt(phase: Phase) -> &'static str {
    match phase {
        Phase::Analyze => DEFAULT_ANALYZE,
        Phase::Plan => DEFAULT_PLAN,
        Phase::Evaluate => DEFAULT_EVALUATE,
        Phase::Synthesize => DEFAULT_SYNTHESIZE,
        Phase::FastResponse => DEFAULT_FAST_RESPONSE,
    }
}

/// Resolve a phase template: prompt store first, compiled-in fallback
/// on any miss or error.
pub async fn resolve_prompt(
    store: Option<&dyn PromptStore>,
    phase: Phase,
    fallback: &str,
) -> String {
    if let Some(store) = store {
        match store.get_prompt(prompt_key(phase)).await {
            Ok(template) if !template.trim().is_empty() => return template,
            Ok(_) => {}
            Err(e) => {
                debug!(key = prompt_key(phase), error = %e, "Prompt store miss, using default");
            }
        }
    }
    fallback.to_string()
}

/// Substitute `{name}` placeholders in a template.
pub fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (name, value) in substitutions {
        rendered = rendered.replace(&format!("{{{name}}}"), value);
    }
    rendered
}

const DEFAULT_ANALYZE: &str = r#"You analyze user queries for a document research agent.
Identify the user's intent and how to search for an answer.

Conversation context:
{context}

Query: {query}

Respond with JSON only:
{"intent_summary": "...", "primary_query": "...", "alternative_queries": ["..."],
 "key_terms": ["..."], "complexity": "simple|moderate|complex",
 "needs_web": false, "source_priority": ["org", "cloud", "personal"],
 "confidence": 0.0}"#;

const DEFAULT_PLAN: &str = r#"You plan search tasks for a document research agent.

Query: {query}

Analysis:
{analysis}

Available sources:
{sources}

Task kinds: search_org, search_cloud, search_personal, search_all,
web_search, browse_url, summarize, refine_query. Tasks may depend on
earlier tasks via "depends_on". Keep ids unique.

Respond with JSON only:
{"intent": "...", "strategy_hint": "parallel|sequential|iterative",
 "success_criteria": ["..."], "max_iterations": 3,
 "tasks": [{"id": "t1", "kind": "search_all", "query": "...",
            "depends_on": [], "max_results": 10}]}"#;

const DEFAULT_EVALUATE: &str = r#"You evaluate whether gathered results answer the user's intent.

Intent: {intent}
Success criteria:
{criteria}
Iteration: {iteration}

Results:
{results}

Respond with JSON only:
{"findings_summary": "...", "gaps": ["..."],
 "decision": "sufficient|need_refinement|need_expansion|cannot_answer",
 "follow_up_tasks": [{"id": "f1", "kind": "search_all", "query": "..."}],
 "reasoning": "...", "confidence": 0.0}"#;

const DEFAULT_SYNTHESIZE: &str = r#"You write a final answer from retrieved sources.
Cite sources inline as [1], [2], ... matching the numbered source list.
If the sources do not answer the question, say so plainly.

Query: {query}

Sources:
{context}

Answer:"#;

const DEFAULT_FAST_RESPONSE: &str = r#"Answer the question directly from the sources below.
Cite sources inline as [1], [2], ... Be concise.

Query: {query}

Sources:
{context}

Answer:"#;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quaero_core::{Error, Result};

    struct FixedStore(Option<String>);

    #[async_trait]
    impl PromptStore for FixedStore {
        async fn get_prompt(&self, _key: &str) -> Result<String> {
            match &self.0 {
                Some(t) => Ok(t.clone()),
                None => Err(Error::NotFound("no template".to_string())),
            }
        }
    }

    #[test]
    fn test_every_phase_has_a_default() {
        for phase in [
            Phase::Analyze,
            Phase::Plan,
            Phase::Evaluate,
            Phase::Synthesize,
            Phase::FastResponse,
        ] {
            assert!(!default_prompt(phase).is_empty());
            assert!(!prompt_key(phase).is_empty());
        }
    }

    #[test]
    fn test_render_substitution() {
        let rendered = render("q={query} c={context}", &[("query", "rust"), ("context", "-")]);
        assert_eq!(rendered, "q=rust c=-");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let rendered = render("{query} {unknown}", &[("query", "x")]);
        assert_eq!(rendered, "x {unknown}");
    }

    #[tokio::test]
    async fn test_resolve_prefers_store() {
        let store = FixedStore(Some("custom template".to_string()));
        let resolved = resolve_prompt(Some(&store), Phase::Analyze, "fallback").await;
        assert_eq!(resolved, "custom template");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_on_error() {
        let store = FixedStore(None);
        let resolved = resolve_prompt(Some(&store), Phase::Analyze, "fallback").await;
        assert_eq!(resolved, "fallback");
    }

    #[tokio::test]
    async fn test_resolve_falls_back_on_empty_template() {
        let store = FixedStore(Some("   ".to_string()));
        let resolved = resolve_prompt(Some(&store), Phase::Plan, "fallback").await;
        assert_eq!(resolved, "fallback");
    }

    #[tokio::test]
    async fn test_resolve_without_store() {
        let resolved = resolve_prompt(None, Phase::Synthesize, "fallback").await;
        assert_eq!(resolved, "fallback");
    }
}
