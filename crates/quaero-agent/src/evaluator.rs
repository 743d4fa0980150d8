//! Evaluation phase: decide whether accumulated results are sufficient.

use serde_json::Value;
use tracing::warn;

use quaero_core::{
    CompletionRequest, EvalDecision, EvaluationDecision, LlmBackend, PromptStore, WorkerResult,
};
use quaero_strategy::{prompts, Phase, Strategy};

use crate::llm_json;
use crate::planner;

/// Run the EVALUATE phase for one iteration. A failed LLM call or an
/// unparseable response becomes a conservative decision (need
/// refinement, zero confidence, no follow-ups) which ends the loop via
/// the no-follow-ups rule rather than erroring.
pub async fn evaluate(
    llm: &dyn LlmBackend,
    strategy: &dyn Strategy,
    prompt_store: Option<&dyn PromptStore>,
    intent: &str,
    success_criteria: &[String],
    results: &[WorkerResult],
    iteration: u32,
) -> (EvaluationDecision, u32) {
    let template = prompts::resolve_prompt(
        prompt_store,
        Phase::Evaluate,
        &strategy.prompt_for(Phase::Evaluate),
    )
    .await;
    let prompt = prompts::render(
        &template,
        &[
            ("intent", intent),
            ("criteria", &render_criteria(success_criteria)),
            ("iteration", &iteration.to_string()),
            ("results", &render_results(results)),
        ],
    );

    match llm
        .complete(CompletionRequest::new(prompt, "evaluate").expecting_json())
        .await
    {
        Ok(completion) => {
            let raw = llm_json::parse_llm_json(&completion.text);
            if llm_json::is_parse_error(&raw) {
                warn!(iteration, "Evaluation response was not JSON, stopping refinement");
                return (conservative_decision(iteration), completion.tokens_used);
            }
            (from_raw(raw, iteration), completion.tokens_used)
        }
        Err(e) => {
            warn!(iteration, error = %e, "Evaluation failed, stopping refinement");
            (conservative_decision(iteration), 0)
        }
    }
}

fn from_raw(raw: Value, iteration: u32) -> EvaluationDecision {
    let decision = raw
        .get("decision")
        .cloned()
        .and_then(|v| serde_json::from_value::<EvalDecision>(v).ok())
        .unwrap_or(EvalDecision::NeedRefinement);

    let follow_up_tasks = raw
        .get("follow_up_tasks")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(planner::parse_task).collect())
        .unwrap_or_default();

    EvaluationDecision {
        phase: format!("evaluate_{iteration}"),
        findings_summary: raw
            .get("findings_summary")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        gaps: raw
            .get("gaps")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default(),
        decision,
        follow_up_tasks,
        reasoning: raw
            .get("reasoning")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string(),
        confidence: raw
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0) as f32,
    }
}

fn conservative_decision(iteration: u32) -> EvaluationDecision {
    EvaluationDecision {
        phase: format!("evaluate_{iteration}"),
        findings_summary: String::new(),
        gaps: Vec::new(),
        decision: EvalDecision::NeedRefinement,
        follow_up_tasks: Vec::new(),
        reasoning: "evaluation unavailable".to_string(),
        confidence: 0.0,
    }
}

fn render_criteria(criteria: &[String]) -> String {
    if criteria.is_empty() {
        return "(none stated)".to_string();
    }
    criteria
        .iter()
        .map(|c| format!("- {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Compact per-task summary handed to the evaluator, never full texts.
fn render_results(results: &[WorkerResult]) -> String {
    if results.is_empty() {
        return "(no results)".to_string();
    }
    results
        .iter()
        .map(|r| {
            let titles: Vec<&str> = r
                .documents
                .iter()
                .take(3)
                .map(|d| d.title.as_str())
                .collect();
            format!(
                "- task {} ({}): quality={}, {} documents, {} web refs{}{}",
                r.task_id,
                r.kind.as_str(),
                r.quality.as_str(),
                r.documents.len(),
                r.web_refs.len(),
                if titles.is_empty() {
                    String::new()
                } else {
                    format!("; top: {}", titles.join(", "))
                },
                r.error
                    .as_deref()
                    .map(|e| format!("; error: {e}"))
                    .unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
