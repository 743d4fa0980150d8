//! Analysis and planning phases.
//!
//! Both phases call the LLM and must stay total: an LLM failure or a
//! malformed response degrades to conservative defaults, and a single
//! malformed task in a plan is dropped rather than killing the plan.

use serde_json::Value;
use tracing::{debug, warn};

use quaero_core::{
    AgentPlan, ChatMessage, CompletionRequest, DataSource, LlmBackend, PromptStore, StrategyHint,
    TaskDefinition, TaskKind,
};
use quaero_strategy::{prompts, Phase, Strategy};

use crate::config::AgentConfig;
use crate::context;
use crate::llm_json;

/// Run the ANALYZE phase. Returns the normalized analysis and tokens
/// spent; never fails.
pub async fn analyze(
    llm: &dyn LlmBackend,
    strategy: &dyn Strategy,
    prompt_store: Option<&dyn PromptStore>,
    query: &str,
    history: &[ChatMessage],
    config: &AgentConfig,
) -> (Value, u32) {
    let selected = context::select_context(
        history,
        query,
        config.history_window,
        config.context_max_entries,
    );
    let template = prompts::resolve_prompt(
        prompt_store,
        Phase::Analyze,
        &strategy.prompt_for(Phase::Analyze),
    )
    .await;
    let prompt = prompts::render(
        &template,
        &[
            ("query", query),
            ("context", &context::render_context(&selected)),
        ],
    );

    match llm
        .complete(CompletionRequest::new(prompt, "analyze").expecting_json())
        .await
    {
        Ok(completion) => {
            let raw = llm_json::parse_llm_json(&completion.text);
            (strategy.post_process_analysis(raw), completion.tokens_used)
        }
        Err(e) => {
            warn!(error = %e, "Analysis failed, using defaults");
            (strategy.post_process_analysis(Value::Null), 0)
        }
    }
}

/// Run the PLAN phase. The returned plan always carries at least one
/// task: when the LLM yields none parseable, deterministic defaults are
/// synthesized from the analysis.
pub async fn plan(
    llm: &dyn LlmBackend,
    strategy: &dyn Strategy,
    prompt_store: Option<&dyn PromptStore>,
    query: &str,
    analysis: &Value,
    sources: &[DataSource],
    config: &AgentConfig,
) -> (AgentPlan, u32) {
    let template = prompts::resolve_prompt(
        prompt_store,
        Phase::Plan,
        &strategy.prompt_for(Phase::Plan),
    )
    .await;
    let prompt = prompts::render(
        &template,
        &[
            ("query", query),
            ("analysis", &analysis.to_string()),
            ("sources", &render_sources(sources)),
        ],
    );

    let (raw, tokens_used) = match llm
        .complete(CompletionRequest::new(prompt, "plan").expecting_json())
        .await
    {
        Ok(completion) => (
            llm_json::parse_llm_json(&completion.text),
            completion.tokens_used,
        ),
        Err(e) => {
            warn!(error = %e, "Planning failed, synthesizing default tasks");
            (Value::Null, 0)
        }
    };

    let mut tasks: Vec<TaskDefinition> = raw
        .get("tasks")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_task).collect())
        .unwrap_or_default();
    // Duplicate ids violate the plan contract; keep the first.
    dedup_task_ids(&mut tasks);

    if tasks.is_empty() {
        tasks = default_tasks(query, analysis, config);
        debug!(task_count = tasks.len(), "Using deterministic default tasks");
    }

    let max_iterations = raw
        .get("max_iterations")
        .and_then(Value::as_u64)
        .map(|n| n as u32)
        .unwrap_or(strategy.config().max_iterations)
        .clamp(1, config.max_iterations.max(1));

    let plan = AgentPlan {
        intent: raw
            .get("intent")
            .and_then(Value::as_str)
            .or_else(|| analysis.get("intent_summary").and_then(Value::as_str))
            .unwrap_or(query)
            .to_string(),
        strategy_hint: raw
            .get("strategy_hint")
            .cloned()
            .and_then(|v| serde_json::from_value::<StrategyHint>(v).ok())
            .unwrap_or_default(),
        tasks,
        success_criteria: raw
            .get("success_criteria")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        max_iterations,
    };
    (plan, tokens_used)
}

/// Parse one task entry leniently; malformed entries are dropped with a
/// warning, not fatal to the plan.
pub fn parse_task(value: &Value) -> Option<TaskDefinition> {
    match serde_json::from_value::<TaskDefinition>(value.clone()) {
        Ok(task) if !task.id.trim().is_empty() && !task.query.trim().is_empty() => Some(task),
        Ok(task) => {
            warn!(task_id = %task.id, "Dropping task with empty id or query");
            None
        }
        Err(e) => {
            warn!(error = %e, "Dropping malformed task in plan");
            None
        }
    }
}

fn dedup_task_ids(tasks: &mut Vec<TaskDefinition>) {
    let mut seen = std::collections::HashSet::new();
    tasks.retain(|t| {
        if seen.insert(t.id.clone()) {
            true
        } else {
            warn!(task_id = %t.id, "Dropping task with duplicate id");
            false
        }
    });
}

/// Deterministic fallback tasks built from the analysis: the primary
/// query against all sources, one alternative query if present, and a
/// web search when the analysis asked for one.
pub fn default_tasks(query: &str, analysis: &Value, config: &AgentConfig) -> Vec<TaskDefinition> {
    let primary = analysis
        .get("primary_query")
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty())
        .unwrap_or(query);

    let mut tasks = vec![TaskDefinition::new("default-1", TaskKind::SearchAll, primary)
        .with_max_results(config.default_search_limit)];

    if let Some(alternative) = analysis
        .get("alternative_queries")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
        .and_then(Value::as_str)
        .filter(|q| !q.trim().is_empty() && *q != primary)
    {
        tasks.push(
            TaskDefinition::new("default-2", TaskKind::SearchAll, alternative)
                .with_max_results(config.default_search_limit),
        );
    }

    if analysis
        .get("needs_web")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        tasks.push(
            TaskDefinition::new("default-web", TaskKind::WebSearch, primary)
                .with_max_results(5),
        );
    }

    tasks
}

fn render_sources(sources: &[DataSource]) -> String {
    if sources.is_empty() {
        return "(no sources available)".to_string();
    }
    sources
        .iter()
        .map(|s| format!("- {} [{}]: {}", s.id, s.kind, s.display_name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockLlm;
    use quaero_strategy::enhanced::EnhancedStrategy;
    use serde_json::json;

    fn config() -> AgentConfig {
        AgentConfig::default()
    }

    #[tokio::test]
    async fn test_analyze_normalizes_llm_json() {
        let llm = MockLlm::new().with_response(
            "analyze",
            r#"```json
{"intent_summary": "find runbook", "primary_query": "deploy runbook", "confidence": 0.9}
```"#,
        );
        let strategy = EnhancedStrategy::new();
        let (analysis, tokens) =
            analyze(&llm, &strategy, None, "where is the deploy runbook", &[], &config()).await;
        assert_eq!(analysis["intent_summary"], "find runbook");
        assert_eq!(analysis["primary_query"], "deploy runbook");
        // Defaults filled for absent fields.
        assert_eq!(analysis["needs_web"], false);
        assert!(tokens > 0);
    }

    #[tokio::test]
    async fn test_analyze_llm_failure_yields_defaults() {
        let llm = MockLlm::new().with_failure();
        let strategy = EnhancedStrategy::new();
        let (analysis, tokens) = analyze(&llm, &strategy, None, "query", &[], &config()).await;
        assert_eq!(analysis["intent_summary"], "general_information");
        assert_eq!(tokens, 0);
    }

    #[tokio::test]
    async fn test_plan_parses_tasks() {
        let llm = MockLlm::new().with_response(
            "plan",
            r#"{"intent": "find it", "strategy_hint": "parallel",
                "success_criteria": ["runbook located"], "max_iterations": 2,
                "tasks": [
                  {"id": "t1", "kind": "search_all", "query": "deploy runbook"},
                  {"id": "t2", "kind": "web_search", "query": "deploy best practices",
                   "depends_on": ["t1"], "max_results": 5}
                ]}"#,
        );
        let strategy = EnhancedStrategy::new();
        let (plan, _) = plan(
            &llm,
            &strategy,
            None,
            "query",
            &json!({}),
            &[],
            &config(),
        )
        .await;
        assert_eq!(plan.intent, "find it");
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[1].depends_on, vec!["t1".to_string()]);
        assert_eq!(plan.max_iterations, 2);
        assert_eq!(plan.success_criteria, vec!["runbook located".to_string()]);
    }

    #[tokio::test]
    async fn test_plan_drops_malformed_tasks_keeps_good_ones() {
        let llm = MockLlm::new().with_response(
            "plan",
            r#"{"tasks": [
                  {"id": "good", "kind": "search_all", "query": "valid"},
                  {"id": "bad-kind", "kind": "quantum_search", "query": "x"},
                  {"kind": "search_all", "query": "missing id"},
                  {"id": "empty-query", "kind": "search_all", "query": "  "}
                ]}"#,
        );
        let strategy = EnhancedStrategy::new();
        let (plan, _) =
            plan(&llm, &strategy, None, "query", &json!({}), &[], &config()).await;
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].id, "good");
    }

    #[tokio::test]
    async fn test_plan_zero_tasks_synthesizes_defaults() {
        let llm = MockLlm::new().with_response("plan", r#"{"tasks": []}"#);
        let strategy = EnhancedStrategy::new();
        let analysis = json!({
            "primary_query": "deploy runbook",
            "alternative_queries": ["release procedure"],
            "needs_web": true,
        });
        let (plan, _) =
            plan(&llm, &strategy, None, "original query", &analysis, &[], &config()).await;
        assert_eq!(plan.tasks.len(), 3);
        assert_eq!(plan.tasks[0].query, "deploy runbook");
        assert_eq!(plan.tasks[1].query, "release procedure");
        assert_eq!(plan.tasks[2].kind, TaskKind::WebSearch);
    }

    #[tokio::test]
    async fn test_plan_llm_failure_synthesizes_defaults() {
        let llm = MockLlm::new().with_failure();
        let strategy = EnhancedStrategy::new();
        let (plan, tokens) =
            plan(&llm, &strategy, None, "the query", &json!({}), &[], &config()).await;
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].query, "the query");
        assert_eq!(tokens, 0);
    }

    #[tokio::test]
    async fn test_plan_duplicate_ids_deduped() {
        let llm = MockLlm::new().with_response(
            "plan",
            r#"{"tasks": [
                  {"id": "t1", "kind": "search_all", "query": "first"},
                  {"id": "t1", "kind": "search_all", "query": "second"}
                ]}"#,
        );
        let strategy = EnhancedStrategy::new();
        let (plan, _) =
            plan(&llm, &strategy, None, "query", &json!({}), &[], &config()).await;
        assert_eq!(plan.tasks.len(), 1);
        assert_eq!(plan.tasks[0].query, "first");
    }

    #[tokio::test]
    async fn test_plan_max_iterations_clamped() {
        let llm = MockLlm::new().with_response(
            "plan",
            r#"{"tasks": [{"id": "t1", "kind": "search_all", "query": "q"}],
                "max_iterations": 99}"#,
        );
        let strategy = EnhancedStrategy::new();
        let (plan, _) =
            plan(&llm, &strategy, None, "query", &json!({}), &[], &config()).await;
        assert_eq!(plan.max_iterations, config().max_iterations);
    }

    #[test]
    fn test_parse_task_valid() {
        let task = parse_task(&json!({
            "id": "t1", "kind": "browse_url", "query": "https://x"
        }))
        .unwrap();
        assert_eq!(task.kind, TaskKind::BrowseUrl);
        assert_eq!(task.max_results, 10);
    }

    #[test]
    fn test_parse_task_rejects_unknown_kind() {
        assert!(parse_task(&json!({"id": "t", "kind": "teleport", "query": "q"})).is_none());
    }
}
