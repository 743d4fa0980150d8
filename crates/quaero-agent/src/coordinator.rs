//! The orchestration loop.
//!
//! One coordinator serves many requests; each request runs the
//! analyze → plan → (execute → evaluate)* → synthesize machine, or a
//! direct fast path for short lookups. Every phase transition and task
//! completion emits an event, and the request only ever fails for
//! configuration errors — missing data degrades to a textual answer
//! plus a complete trace.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument};

use quaero_core::{
    resolve_sources, ActiveContext, AgentEvent, AgentTrace, ChatMessage, DocumentStore,
    EmbeddingBackend, EventBus, LlmBackend, PromptStore, Result, TaskDefinition, TaskKind,
    WebFetcher, WebSearchProvider, WorkerResult,
};
use quaero_strategy::{
    ExecutionRecord, Phase, Strategy, StrategyMetadata, StrategyMetrics, StrategyRegistry,
    StrategySummary,
};
use tokio::sync::broadcast;

use crate::config::AgentConfig;
use crate::evaluator;
use crate::planner;
use crate::scheduler;
use crate::synthesis::{self, SynthesisResult};
use crate::tasks::TaskRuntime;

/// Queries carrying any of these words never take the fast path.
const ANALYTICAL_KEYWORDS: &[&str] = &[
    "compare", "analyze", "analyse", "explain", "why", "how", "difference", "versus",
    "impact", "history", "tradeoff", "summarize",
];

/// Words that add a web search task to the fast path.
const WEB_HINT_KEYWORDS: &[&str] = &["latest", "news", "current", "today", "recent"];

/// Who is asking.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    pub user_id: String,
    pub email: Option<String>,
}

impl RequestIdentity {
    pub fn new(user_id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email,
        }
    }
}

/// Per-request context: active working context, conversation history,
/// and optional strategy routing overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub active_context: Option<ActiveContext>,
    pub accessible_context_keys: Option<Vec<String>>,
    pub history: Vec<ChatMessage>,
    /// Explicit strategy id; an unknown id is a hard error.
    pub strategy_id: Option<String>,
    /// Domain routing when no explicit id is given.
    pub domain: Option<String>,
}

/// Request coordinator. Construct once with the collaborators and the
/// strategy registry, then call [`Coordinator::process`] per request.
pub struct Coordinator {
    registry: Arc<StrategyRegistry>,
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn EmbeddingBackend>,
    llm: Arc<dyn LlmBackend>,
    web_search: Option<Arc<dyn WebSearchProvider>>,
    web_fetch: Option<Arc<dyn WebFetcher>>,
    prompt_store: Option<Arc<dyn PromptStore>>,
    metrics: Arc<StrategyMetrics>,
    config: AgentConfig,
    events: EventBus,
}

impl Coordinator {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        store: Arc<dyn DocumentStore>,
        embedder: Arc<dyn EmbeddingBackend>,
        llm: Arc<dyn LlmBackend>,
        config: AgentConfig,
    ) -> Self {
        Self {
            registry,
            store,
            embedder,
            llm,
            web_search: None,
            web_fetch: None,
            prompt_store: None,
            metrics: Arc::new(StrategyMetrics::new()),
            config,
            events: EventBus::default(),
        }
    }

    pub fn with_web_search(mut self, provider: Arc<dyn WebSearchProvider>) -> Self {
        self.web_search = Some(provider);
        self
    }

    pub fn with_web_fetcher(mut self, fetcher: Arc<dyn WebFetcher>) -> Self {
        self.web_fetch = Some(fetcher);
        self
    }

    pub fn with_prompt_store(mut self, store: Arc<dyn PromptStore>) -> Self {
        self.prompt_store = Some(store);
        self
    }

    /// Subscribe to progress events for this coordinator.
    pub fn subscribe_events(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> &StrategyMetrics {
        &self.metrics
    }

    // -----------------------------------------------------------------------
    // Management surface
    // -----------------------------------------------------------------------

    pub fn list_strategies(&self) -> Vec<StrategyMetadata> {
        self.registry.list()
    }

    pub fn get_strategy(&self, id: &str) -> Result<StrategyMetadata> {
        Ok(self.registry.get(id)?.metadata().clone())
    }

    pub fn auto_detect_strategy(&self, query: &str) -> Result<StrategyMetadata> {
        Ok(self.registry.auto_detect(query)?.metadata().clone())
    }

    pub fn compare_strategies(&self, ids: &[&str]) -> Vec<StrategySummary> {
        self.metrics.compare(ids)
    }

    /// Amend a past execution with user feedback.
    pub fn add_feedback(&self, session_id: uuid::Uuid, score: f32) -> bool {
        self.metrics.add_feedback(session_id, score)
    }

    // -----------------------------------------------------------------------
    // Entry point
    // -----------------------------------------------------------------------

    /// Process one query: resolve sources and strategy, run the fast or
    /// full path, and return the answer with its complete trace.
    ///
    /// Errors are reserved for configuration problems (empty strategy
    /// catalog, explicitly requested unknown strategy id); missing data
    /// always produces a textual answer.
    #[instrument(skip_all, fields(
        subsystem = "coordinator",
        op = "process",
        query = %query,
        user_id = %identity.user_id,
    ))]
    pub async fn process(
        &self,
        query: &str,
        identity: &RequestIdentity,
        request: &RequestContext,
    ) -> Result<(String, AgentTrace)> {
        let strategy = self.resolve_strategy(query, request)?;
        let strategy_id = strategy.metadata().id.clone();
        let sources = resolve_sources(
            &identity.user_id,
            identity.email.as_deref(),
            request.active_context.as_ref(),
            request.accessible_context_keys.as_deref(),
        );
        info!(
            strategy_id = %strategy_id,
            source_count = sources.len(),
            "Processing request"
        );

        let mut trace = AgentTrace::new(&strategy_id, self.config.snapshot());
        let runtime = Arc::new(TaskRuntime {
            store: self.store.clone(),
            embedder: self.embedder.clone(),
            llm: self.llm.clone(),
            web_search: self.web_search.clone(),
            web_fetch: self.web_fetch.clone(),
            strategy: strategy.clone(),
            sources,
            config: self.config.clone(),
        });

        let started = Instant::now();
        let outcome = if self.takes_fast_path(query) {
            self.run_fast_path(query, &runtime, &mut trace).await
        } else {
            self.run_full_path(query, request, &runtime, &mut trace).await
        };

        trace.finalize(self.config.cost_per_1k_tokens);
        self.events.emit(AgentEvent::AnswerReady {
            trace_id: trace.id,
            duration_ms: started.elapsed().as_millis() as u64,
            documents_cited: trace.documents.len(),
        });
        self.metrics.record(ExecutionRecord {
            session_id: trace.id,
            strategy_id,
            duration_ms: trace.total_duration_ms,
            tokens_used: trace.total_tokens,
            iterations: trace.iterations,
            documents_found: trace.documents.len(),
            answered: !outcome.from_fallback,
            feedback: None,
            at: Utc::now(),
        });

        Ok((outcome.answer, trace))
    }

    fn resolve_strategy(
        &self,
        query: &str,
        request: &RequestContext,
    ) -> Result<Arc<dyn Strategy>> {
        if let Some(id) = &request.strategy_id {
            return self.registry.get(id);
        }
        if let Some(domain) = &request.domain {
            return self.registry.for_domain(domain);
        }
        self.registry.auto_detect(query)
    }

    /// Length/keyword heuristic for the direct fast path.
    fn takes_fast_path(&self, query: &str) -> bool {
        if self.config.force_fast_path {
            return true;
        }
        if self.config.force_full_path {
            return false;
        }
        if query.chars().count() > self.config.fast_path_max_len {
            return false;
        }
        let lower = query.to_lowercase();
        !lower
            .split_whitespace()
            .any(|w| ANALYTICAL_KEYWORDS.contains(&w))
    }

    // -----------------------------------------------------------------------
    // Fast path
    // -----------------------------------------------------------------------

    async fn run_fast_path(
        &self,
        query: &str,
        runtime: &Arc<TaskRuntime>,
        trace: &mut AgentTrace,
    ) -> SynthesisResult {
        debug!(trace_id = %trace.id, "Taking fast path");
        let tasks = self.fast_path_tasks(query);
        self.run_batch(runtime, trace, tasks, "fast_execute").await;
        trace.iterations = 1;

        self.run_synthesis(query, runtime, trace, Phase::FastResponse)
            .await
    }

    fn fast_path_tasks(&self, query: &str) -> Vec<TaskDefinition> {
        let mut tasks = vec![
            TaskDefinition::new("fast-1", TaskKind::SearchAll, query)
                .with_max_results(self.config.default_search_limit),
        ];
        let lower = query.to_lowercase();
        let wants_web = lower
            .split_whitespace()
            .any(|w| WEB_HINT_KEYWORDS.contains(&w));
        if wants_web && self.web_search.is_some() {
            tasks.push(TaskDefinition::new("fast-web", TaskKind::WebSearch, query).with_max_results(5));
        }
        tasks
    }

    // -----------------------------------------------------------------------
    // Full path
    // -----------------------------------------------------------------------

    async fn run_full_path(
        &self,
        query: &str,
        request: &RequestContext,
        runtime: &Arc<TaskRuntime>,
        trace: &mut AgentTrace,
    ) -> SynthesisResult {
        let strategy = runtime.strategy.as_ref();

        // ANALYZE
        self.emit_phase_started(trace, "analyze");
        let phase_start = Instant::now();
        let (analysis, tokens) = planner::analyze(
            self.llm.as_ref(),
            strategy,
            self.prompt_store.as_deref(),
            query,
            &request.history,
            &self.config,
        )
        .await;
        let summary = analysis["intent_summary"].as_str().unwrap_or("").to_string();
        self.close_phase(trace, "analyze", &summary, phase_start, tokens);

        // PLAN
        self.emit_phase_started(trace, "plan");
        let phase_start = Instant::now();
        let (plan, tokens) = planner::plan(
            self.llm.as_ref(),
            strategy,
            self.prompt_store.as_deref(),
            query,
            &analysis,
            &runtime.sources,
            &self.config,
        )
        .await;
        self.close_phase(
            trace,
            "plan",
            &format!("{} tasks, max {} iterations", plan.tasks.len(), plan.max_iterations),
            phase_start,
            tokens,
        );

        // EXECUTE / EVALUATE loop
        let mut current_tasks = plan.tasks.clone();
        let mut consecutive_empty = 0u32;
        for iteration in 1..=plan.max_iterations {
            if current_tasks.is_empty() {
                break;
            }
            trace.iterations = iteration;

            let results = self
                .run_batch(runtime, trace, current_tasks.clone(), "execute")
                .await;
            let batch_items: usize = results.iter().map(WorkerResult::item_count).sum();

            // Two consecutive empty batches: no point refining against
            // an empty well.
            if batch_items == 0 {
                consecutive_empty += 1;
                if consecutive_empty >= 2 {
                    debug!(trace_id = %trace.id, iteration, "Two empty iterations, stopping");
                    self.emit_iteration(trace, iteration, None);
                    break;
                }
            } else {
                consecutive_empty = 0;
            }

            // Pre-evaluation quality skip (iteration 1 only).
            if strategy.should_exit_early(&results, None, iteration) {
                debug!(trace_id = %trace.id, iteration, "Quality early-exit, skipping evaluation");
                self.emit_iteration(trace, iteration, None);
                break;
            }

            // EVALUATE
            self.emit_phase_started(trace, "evaluate");
            let phase_start = Instant::now();
            let (evaluation, tokens) = evaluator::evaluate(
                self.llm.as_ref(),
                strategy,
                self.prompt_store.as_deref(),
                &plan.intent,
                &plan.success_criteria,
                &results,
                iteration,
            )
            .await;
            self.close_phase(
                trace,
                "evaluate",
                &format!(
                    "{} (confidence {:.2})",
                    evaluation.decision.as_str(),
                    evaluation.confidence
                ),
                phase_start,
                tokens,
            );
            self.emit_iteration(trace, iteration, Some(evaluation.decision.as_str()));

            let exit_early = strategy.should_exit_early(&results, Some(&evaluation), iteration);
            let terminal = evaluation.decision.is_terminal();
            let follow_ups = evaluation.follow_up_tasks.clone();
            trace.record_evaluation(evaluation);

            if exit_early || terminal || follow_ups.is_empty() {
                break;
            }
            current_tasks = follow_ups;
        }

        self.run_synthesis(query, runtime, trace, Phase::Synthesize).await
    }

    /// Execute one task batch, accumulating results into the trace and
    /// emitting per-task events.
    async fn run_batch(
        &self,
        runtime: &Arc<TaskRuntime>,
        trace: &mut AgentTrace,
        tasks: Vec<TaskDefinition>,
        phase_label: &str,
    ) -> Vec<WorkerResult> {
        self.emit_phase_started(trace, phase_label);
        let phase_start = Instant::now();
        let task_count = tasks.len();

        let events = &self.events;
        let trace_id = trace.id;
        let on_complete = move |result: &WorkerResult| -> Result<()> {
            events.emit(AgentEvent::TaskCompleted {
                trace_id,
                task_id: result.task_id.clone(),
                kind: result.kind.as_str().to_string(),
                success: result.success,
                quality: result.quality.as_str().to_string(),
                duration_ms: result.duration_ms,
            });
            Ok(())
        };

        let results = scheduler::execute_tasks(
            runtime.clone(),
            tasks,
            trace.worker_steps.clone(),
            Some(&on_complete),
        )
        .await;

        let mut batch_items = 0usize;
        for result in &results {
            batch_items += result.item_count();
            trace.add_documents(result.documents.iter().cloned());
            trace.add_web_links(result.web_refs.iter().cloned());
            trace.record_worker(result.clone());
        }
        self.close_phase(
            trace,
            phase_label,
            &format!("{task_count} tasks, {batch_items} items"),
            phase_start,
            0,
        );
        results
    }

    async fn run_synthesis(
        &self,
        query: &str,
        runtime: &Arc<TaskRuntime>,
        trace: &mut AgentTrace,
        phase: Phase,
    ) -> SynthesisResult {
        self.emit_phase_started(trace, phase.as_str());
        let phase_start = Instant::now();
        let documents = trace.documents.clone();
        let links = trace.web_links.clone();
        let outcome = synthesis::synthesize(
            self.llm.as_ref(),
            runtime.strategy.as_ref(),
            self.prompt_store.as_deref(),
            query,
            &documents,
            &links,
            &self.config,
            phase,
        )
        .await;
        self.close_phase(
            trace,
            phase.as_str(),
            if outcome.from_fallback {
                "fallback answer"
            } else {
                "llm answer"
            },
            phase_start,
            outcome.tokens_used,
        );
        outcome
    }

    fn emit_phase_started(&self, trace: &AgentTrace, phase: &str) {
        self.events.emit(AgentEvent::PhaseStarted {
            trace_id: trace.id,
            phase: phase.to_string(),
        });
    }

    fn close_phase(
        &self,
        trace: &mut AgentTrace,
        phase: &str,
        summary: &str,
        started: Instant,
        tokens: u32,
    ) {
        let duration_ms = started.elapsed().as_millis() as u64;
        trace.record_step(phase, summary, duration_ms, tokens);
        self.events.emit(AgentEvent::PhaseCompleted {
            trace_id: trace.id,
            phase: phase.to_string(),
            duration_ms,
            tokens_used: tokens,
            reasoning: if summary.is_empty() {
                None
            } else {
                Some(summary.to_string())
            },
        });
    }

    fn emit_iteration(&self, trace: &AgentTrace, iteration: u32, decision: Option<&str>) {
        self.events.emit(AgentEvent::IterationCompleted {
            trace_id: trace.id,
            iteration,
            documents_found: trace.documents.len(),
            decision: decision.map(String::from),
        });
    }
}
