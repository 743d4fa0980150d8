//! Data model for the quaero agent.
//!
//! These types flow through the whole pipeline: sources resolved per
//! request, raw hits produced by the hybrid search engine, fused
//! document references, the task/plan/evaluation shapes exchanged with
//! the LLM, and the execution trace accumulated per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Maximum excerpt length carried on a fused document reference.
pub const MAX_EXCERPT_LEN: usize = 500;

// ============================================================================
// Data sources
// ============================================================================

/// Logical class of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Organization/workspace-scoped shared collection.
    OrgShared,
    /// Cloud collection shared within the active context.
    CloudShared,
    /// Cloud collection private to the requesting user.
    CloudPrivate,
    /// The user's personal namespace.
    Personal,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrgShared => write!(f, "org_shared"),
            Self::CloudShared => write!(f, "cloud_shared"),
            Self::CloudPrivate => write!(f, "cloud_private"),
            Self::Personal => write!(f, "personal"),
        }
    }
}

/// How access to a data source is granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessKind {
    /// Granted by membership in the active org/context.
    OrgMembership,
    /// Open to everyone with the shared context key.
    SharedOpen,
    /// Only the owning user may query.
    PrivateOwner,
}

/// A queryable document collection, derived fresh per request from the
/// user identity and active context. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: String,
    pub kind: SourceKind,
    /// Opaque handle the document store uses to address this collection.
    pub store_handle: String,
    pub access: AccessKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_key: Option<String>,
    pub display_name: String,
}

// ============================================================================
// Search hits and references
// ============================================================================

/// Which retrieval method produced a raw hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchKind {
    Vector,
    Lexical,
}

/// A raw, pre-fusion hit from one retrieval method against one source.
///
/// Ephemeral: lives only between retrieval and fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub parent_document_id: String,
    pub text: String,
    /// Origin-relevance score in the producing method's own scale
    /// (cosine similarity for vector, lexical relevance for lexical).
    pub origin_score: f32,
    pub search_kind: SearchKind,
    #[serde(default)]
    pub metadata: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_title: Option<String>,
}

/// A fused, ranked document reference. Scores are comparable across
/// sources; `chunk_id` is the dedup key within one search call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReference {
    pub chunk_id: String,
    pub parent_document_id: String,
    pub title: String,
    pub source_kind: SourceKind,
    pub source_id: String,
    /// Clamped to [`MAX_EXCERPT_LEN`] characters.
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    /// Fused score in [0, 1].
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
}

impl DocumentReference {
    /// Clamp a text to the excerpt budget on a char boundary.
    pub fn make_excerpt(text: &str) -> String {
        if text.chars().count() <= MAX_EXCERPT_LEN {
            text.to_string()
        } else {
            text.chars().take(MAX_EXCERPT_LEN).collect()
        }
    }
}

/// A web search or browse result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebReference {
    pub url: String,
    pub title: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_text: Option<String>,
    /// The query that produced this reference.
    pub query: String,
}

// ============================================================================
// Tasks and worker results
// ============================================================================

/// Kind of work a planned task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Federated search restricted to org-shared sources.
    SearchOrg,
    /// Federated search restricted to cloud sources (shared + private).
    SearchCloud,
    /// Federated search restricted to the personal namespace.
    SearchPersonal,
    /// Federated search across every resolved source.
    SearchAll,
    /// External web search.
    WebSearch,
    /// Fetch and strip a single URL.
    BrowseUrl,
    /// Summarize accumulated results via the LLM.
    Summarize,
    /// Ask the LLM for a refined query.
    RefineQuery,
}

impl TaskKind {
    /// Whether this kind runs against the document stores.
    pub fn is_store_search(&self) -> bool {
        matches!(
            self,
            Self::SearchOrg | Self::SearchCloud | Self::SearchPersonal | Self::SearchAll
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchOrg => "search_org",
            Self::SearchCloud => "search_cloud",
            Self::SearchPersonal => "search_personal",
            Self::SearchAll => "search_all",
            Self::WebSearch => "web_search",
            Self::BrowseUrl => "browse_url",
            Self::Summarize => "summarize",
            Self::RefineQuery => "refine_query",
        }
    }
}

/// One unit of planned work. Tasks form a DAG via `depends_on`;
/// `id` must be unique within one plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: String,
    pub kind: TaskKind,
    /// Query text, or the URL for `BrowseUrl` tasks.
    pub query: String,
    /// Restrict store searches to these source ids (empty = no restriction
    /// beyond the kind's scope filter).
    #[serde(default)]
    pub source_ids: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

fn default_max_results() -> usize {
    10
}

impl TaskDefinition {
    pub fn new(id: impl Into<String>, kind: TaskKind, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            query: query.into(),
            source_ids: Vec::new(),
            priority: 0,
            depends_on: Vec::new(),
            max_results: default_max_results(),
            hint: None,
        }
    }

    pub fn with_depends_on(mut self, deps: Vec<String>) -> Self {
        self.depends_on = deps;
        self
    }

    pub fn with_max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }
}

/// Quality bucket for one task's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultQuality {
    Empty,
    Partial,
    Good,
    Excellent,
}

impl ResultQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Partial => "partial",
            Self::Good => "good",
            Self::Excellent => "excellent",
        }
    }
}

/// Outcome of one executed task. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub task_id: String,
    pub kind: TaskKind,
    pub query: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentReference>,
    #[serde(default)]
    pub web_refs: Vec<WebReference>,
    pub quality: ResultQuality,
    #[serde(default)]
    pub suggested_refinements: Vec<String>,
    /// Summarize/refine output text, when the task produced any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub duration_ms: u64,
    pub tokens_used: u32,
    pub completed_at: DateTime<Utc>,
}

impl WorkerResult {
    /// A failed result carrying only the error message.
    pub fn failed(task: &TaskDefinition, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            task_id: task.id.clone(),
            kind: task.kind,
            query: task.query.clone(),
            success: false,
            error: Some(error.into()),
            documents: Vec::new(),
            web_refs: Vec::new(),
            quality: ResultQuality::Empty,
            suggested_refinements: Vec::new(),
            summary: None,
            duration_ms,
            tokens_used: 0,
            completed_at: Utc::now(),
        }
    }

    /// Total discovered items (documents + web references).
    pub fn item_count(&self) -> usize {
        self.documents.len() + self.web_refs.len()
    }
}

// ============================================================================
// Plans and evaluations
// ============================================================================

/// Execution shape hinted by the planning phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyHint {
    Parallel,
    Sequential,
    Iterative,
}

impl Default for StrategyHint {
    fn default() -> Self {
        Self::Parallel
    }
}

/// The plan produced once per orchestrated request. The task list is
/// replaced (never mutated) each iteration by evaluation follow-ups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPlan {
    pub intent: String,
    #[serde(default)]
    pub strategy_hint: StrategyHint,
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub success_criteria: Vec<String>,
    pub max_iterations: u32,
}

/// Verdict of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalDecision {
    Sufficient,
    NeedRefinement,
    NeedExpansion,
    CannotAnswer,
}

impl EvalDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sufficient => "sufficient",
            Self::NeedRefinement => "need_refinement",
            Self::NeedExpansion => "need_expansion",
            Self::CannotAnswer => "cannot_answer",
        }
    }

    /// Decisions that terminate the iteration loop unconditionally.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Sufficient | Self::CannotAnswer)
    }
}

/// One iteration's evaluation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationDecision {
    pub phase: String,
    pub findings_summary: String,
    #[serde(default)]
    pub gaps: Vec<String>,
    pub decision: EvalDecision,
    #[serde(default)]
    pub follow_up_tasks: Vec<TaskDefinition>,
    pub reasoning: String,
    /// In [0, 1].
    pub confidence: f32,
}

// ============================================================================
// Trace
// ============================================================================

/// One orchestrator phase record in a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStep {
    pub phase: String,
    pub summary: String,
    pub duration_ms: u64,
    pub tokens_used: u32,
    pub at: DateTime<Utc>,
}

/// Full execution trace of one request. Built incrementally and
/// finalized exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTrace {
    pub id: Uuid,
    pub strategy_id: String,
    /// Snapshot of the effective configuration.
    pub config: Value,
    pub orchestrator_steps: Vec<OrchestratorStep>,
    pub worker_steps: Vec<WorkerResult>,
    /// Deduplicated by chunk id, accumulation order preserved.
    pub documents: Vec<DocumentReference>,
    /// Deduplicated by URL.
    pub web_links: Vec<WebReference>,
    pub evaluations: Vec<EvaluationDecision>,
    pub iterations: u32,
    pub total_duration_ms: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentTrace {
    pub fn new(strategy_id: impl Into<String>, config: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            strategy_id: strategy_id.into(),
            config,
            orchestrator_steps: Vec::new(),
            worker_steps: Vec::new(),
            documents: Vec::new(),
            web_links: Vec::new(),
            evaluations: Vec::new(),
            iterations: 0,
            total_duration_ms: 0,
            total_tokens: 0,
            estimated_cost: 0.0,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Record an orchestrator phase and fold its timing/token counts
    /// into the running sums.
    pub fn record_step(
        &mut self,
        phase: impl Into<String>,
        summary: impl Into<String>,
        duration_ms: u64,
        tokens_used: u32,
    ) {
        self.total_duration_ms += duration_ms;
        self.total_tokens += u64::from(tokens_used);
        self.orchestrator_steps.push(OrchestratorStep {
            phase: phase.into(),
            summary: summary.into(),
            duration_ms,
            tokens_used,
            at: Utc::now(),
        });
    }

    /// Record a worker result and fold its token count into the sums.
    pub fn record_worker(&mut self, result: WorkerResult) {
        self.total_tokens += u64::from(result.tokens_used);
        self.worker_steps.push(result);
    }

    /// Accumulate documents, deduplicated by chunk id (first wins).
    pub fn add_documents(&mut self, docs: impl IntoIterator<Item = DocumentReference>) {
        for doc in docs {
            if !self.documents.iter().any(|d| d.chunk_id == doc.chunk_id) {
                self.documents.push(doc);
            }
        }
    }

    /// Accumulate web links, deduplicated by URL (first wins).
    pub fn add_web_links(&mut self, links: impl IntoIterator<Item = WebReference>) {
        for link in links {
            if !self.web_links.iter().any(|l| l.url == link.url) {
                self.web_links.push(link);
            }
        }
    }

    pub fn record_evaluation(&mut self, evaluation: EvaluationDecision) {
        self.evaluations.push(evaluation);
    }

    /// Close the trace: set the finish timestamp and compute the cost
    /// estimate from accumulated tokens. Idempotent — the first call wins.
    pub fn finalize(&mut self, cost_per_1k_tokens: f64) {
        if self.finished_at.is_some() {
            return;
        }
        self.finished_at = Some(Utc::now());
        self.estimated_cost = (self.total_tokens as f64 / 1000.0) * cost_per_1k_tokens;
    }

    pub fn is_finalized(&self) -> bool {
        self.finished_at.is_some()
    }
}

/// One message of conversation history handed to the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}
