//! Per-task dispatch.
//!
//! One executed task is one unit of failure isolation: any collaborator
//! error becomes a failed [`WorkerResult`], never an exception crossing
//! the scheduler boundary.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use quaero_core::{
    CompletionRequest, DataSource, DocumentStore, EmbeddingBackend, LlmBackend, ResultQuality,
    SourceKind, TaskDefinition, TaskKind, WebFetcher, WebSearchProvider, WorkerResult,
};
use quaero_search::{quality, FederatedSearchEngine, SearchMode};
use quaero_strategy::Strategy;

use crate::config::AgentConfig;
use crate::web;

/// Everything a worker task needs to execute: collaborators, the
/// resolved sources, the active strategy, and configuration.
pub struct TaskRuntime {
    pub store: Arc<dyn DocumentStore>,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub llm: Arc<dyn LlmBackend>,
    pub web_search: Option<Arc<dyn WebSearchProvider>>,
    pub web_fetch: Option<Arc<dyn WebFetcher>>,
    pub strategy: Arc<dyn Strategy>,
    pub sources: Vec<DataSource>,
    pub config: AgentConfig,
}

impl TaskRuntime {
    /// Sources a task may query: the kind's scope filter intersected
    /// with an optional explicit source-id restriction.
    pub fn sources_for(&self, task: &TaskDefinition) -> Vec<DataSource> {
        self.sources
            .iter()
            .filter(|source| match task.kind {
                TaskKind::SearchOrg => source.kind == SourceKind::OrgShared,
                TaskKind::SearchCloud => {
                    matches!(source.kind, SourceKind::CloudShared | SourceKind::CloudPrivate)
                }
                TaskKind::SearchPersonal => source.kind == SourceKind::Personal,
                _ => true,
            })
            .filter(|source| task.source_ids.is_empty() || task.source_ids.contains(&source.id))
            .cloned()
            .collect()
    }
}

/// Execute one task. `prior` carries results completed earlier in the
/// request for the LLM-backed task kinds.
pub async fn execute_task(
    runtime: &TaskRuntime,
    task: &TaskDefinition,
    prior: &[WorkerResult],
) -> WorkerResult {
    let start = Instant::now();
    let result = match task.kind {
        TaskKind::SearchOrg
        | TaskKind::SearchCloud
        | TaskKind::SearchPersonal
        | TaskKind::SearchAll => store_search(runtime, task, start).await,
        TaskKind::WebSearch => web_search(runtime, task, start).await,
        TaskKind::BrowseUrl => browse_url(runtime, task, start).await,
        TaskKind::Summarize => summarize(runtime, task, prior, start).await,
        TaskKind::RefineQuery => refine_query(runtime, task, prior, start).await,
    };
    debug!(
        task_id = %task.id,
        kind = task.kind.as_str(),
        success = result.success,
        quality = result.quality.as_str(),
        duration_ms = result.duration_ms,
        "Task complete"
    );
    result
}

async fn store_search(
    runtime: &TaskRuntime,
    task: &TaskDefinition,
    start: Instant,
) -> WorkerResult {
    let sources = runtime.sources_for(task);
    if sources.is_empty() {
        debug!(task_id = %task.id, "No sources in scope for task");
        return WorkerResult {
            quality: ResultQuality::Empty,
            suggested_refinements: quality::refinement_suggestions(
                &task.query,
                task.kind,
                ResultQuality::Empty,
            ),
            ..base_result(task, true, None, start)
        };
    }

    let engine = FederatedSearchEngine::new(runtime.store.clone(), runtime.embedder.clone());
    let strategy = runtime.strategy.clone();
    let fuser = move |source: &DataSource, hits, limit: usize| strategy.fuse(source, hits, limit);
    let (documents, report) = engine
        .search_with(
            &sources,
            &task.query,
            task.max_results,
            SearchMode::Hybrid,
            &fuser,
        )
        .await;

    debug!(
        task_id = %task.id,
        sources_with_results = report.sources_with_results,
        result_count = documents.len(),
        "Federated search done"
    );

    let task_quality = quality::assess_results(&documents, 0);
    WorkerResult {
        documents,
        quality: task_quality,
        suggested_refinements: quality::refinement_suggestions(&task.query, task.kind, task_quality),
        ..base_result(task, true, None, start)
    }
}

async fn web_search(runtime: &TaskRuntime, task: &TaskDefinition, start: Instant) -> WorkerResult {
    let Some(provider) = &runtime.web_search else {
        return WorkerResult::failed(task, "no web search provider configured", elapsed_ms(start));
    };
    match provider.search(&task.query, task.max_results).await {
        Ok(web_refs) => {
            let task_quality = quality::assess_results(&[], web_refs.len());
            WorkerResult {
                web_refs,
                quality: task_quality,
                suggested_refinements: quality::refinement_suggestions(
                    &task.query,
                    task.kind,
                    task_quality,
                ),
                ..base_result(task, true, None, start)
            }
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Web search failed");
            WorkerResult::failed(task, e.to_string(), elapsed_ms(start))
        }
    }
}

async fn browse_url(runtime: &TaskRuntime, task: &TaskDefinition, start: Instant) -> WorkerResult {
    let Some(fetcher) = &runtime.web_fetch else {
        return WorkerResult::failed(task, "no web fetcher configured", elapsed_ms(start));
    };
    // For browse tasks the query field carries the URL; the hint, when
    // present, is the originating query.
    let url = task.query.trim();
    match fetcher.fetch(url).await {
        Ok(html) => {
            let reference =
                web::page_to_reference(url, task.hint.as_deref().unwrap_or(url), &html);
            WorkerResult {
                web_refs: vec![reference],
                quality: quality::assess_results(&[], 1),
                ..base_result(task, true, None, start)
            }
        }
        Err(e) => {
            // Fetch failure yields nothing for this task, not a dead batch.
            warn!(task_id = %task.id, url, error = %e, "Browse failed");
            WorkerResult::failed(task, e.to_string(), elapsed_ms(start))
        }
    }
}

async fn summarize(
    runtime: &TaskRuntime,
    task: &TaskDefinition,
    prior: &[WorkerResult],
    start: Instant,
) -> WorkerResult {
    let context = prior_context(prior, runtime.config.context_item_cap);
    let prompt = format!(
        "Summarize the findings below as they relate to: {}\n\nFindings:\n{}",
        task.query, context
    );
    match runtime
        .llm
        .complete(CompletionRequest::new(prompt, "summarize"))
        .await
    {
        Ok(completion) => {
            let text = completion.text.trim().to_string();
            let task_quality = if text.is_empty() {
                ResultQuality::Empty
            } else {
                ResultQuality::Good
            };
            WorkerResult {
                summary: if text.is_empty() { None } else { Some(text) },
                quality: task_quality,
                tokens_used: completion.tokens_used,
                ..base_result(task, true, None, start)
            }
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Summarize failed");
            WorkerResult::failed(task, e.to_string(), elapsed_ms(start))
        }
    }
}

async fn refine_query(
    runtime: &TaskRuntime,
    task: &TaskDefinition,
    prior: &[WorkerResult],
    start: Instant,
) -> WorkerResult {
    let context = prior_context(prior, runtime.config.context_item_cap);
    let prompt = format!(
        "Rewrite this search query to improve recall against the findings so far.\n\
         Query: {}\n\nFindings:\n{}\n\nRespond with the refined query only.",
        task.query, context
    );
    match runtime
        .llm
        .complete(CompletionRequest::new(prompt, "refine_query"))
        .await
    {
        Ok(completion) => {
            let refined = completion.text.trim().to_string();
            let task_quality = if refined.is_empty() {
                ResultQuality::Empty
            } else {
                ResultQuality::Good
            };
            WorkerResult {
                suggested_refinements: if refined.is_empty() {
                    Vec::new()
                } else {
                    vec![refined.clone()]
                },
                summary: if refined.is_empty() { None } else { Some(refined) },
                quality: task_quality,
                tokens_used: completion.tokens_used,
                ..base_result(task, true, None, start)
            }
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Query refinement failed");
            WorkerResult::failed(task, e.to_string(), elapsed_ms(start))
        }
    }
}

/// Render prior results for LLM consumption, bounded per item.
fn prior_context(prior: &[WorkerResult], item_cap: usize) -> String {
    if prior.is_empty() {
        return "(no prior findings)".to_string();
    }
    let mut sections = Vec::new();
    for result in prior {
        for doc in &result.documents {
            let excerpt: String = doc.excerpt.chars().take(item_cap).collect();
            sections.push(format!("- {} — {}", doc.title, excerpt));
        }
        for web_ref in &result.web_refs {
            let excerpt: String = web_ref.excerpt.chars().take(item_cap).collect();
            sections.push(format!("- {} ({}) — {}", web_ref.title, web_ref.url, excerpt));
        }
        if let Some(summary) = &result.summary {
            sections.push(format!("- summary: {summary}"));
        }
    }
    if sections.is_empty() {
        "(no prior findings)".to_string()
    } else {
        sections.join("\n")
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

fn base_result(
    task: &TaskDefinition,
    success: bool,
    error: Option<String>,
    start: Instant,
) -> WorkerResult {
    WorkerResult {
        task_id: task.id.clone(),
        kind: task.kind,
        query: task.query.clone(),
        success,
        error,
        documents: Vec::new(),
        web_refs: Vec::new(),
        quality: ResultQuality::Empty,
        suggested_refinements: Vec::new(),
        summary: None,
        duration_ms: elapsed_ms(start),
        tokens_used: 0,
        completed_at: Utc::now(),
    }
}
