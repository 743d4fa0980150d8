//! Agent event types and event bus for progress observation.
//!
//! Every phase transition and task completion may emit an event.
//! Consumers (SSE streams, progress UIs, telemetry) subscribe
//! independently; emission never fails and a slow or dropped consumer
//! can never abort the orchestration loop.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Progress event emitted by the coordinator and the worker pool.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AgentEvent {
    /// An orchestration phase began.
    PhaseStarted { trace_id: Uuid, phase: String },
    /// An orchestration phase finished.
    PhaseCompleted {
        trace_id: Uuid,
        phase: String,
        duration_ms: u64,
        tokens_used: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning: Option<String>,
    },
    /// One worker task finished (successfully or not).
    TaskCompleted {
        trace_id: Uuid,
        task_id: String,
        kind: String,
        success: bool,
        quality: String,
        duration_ms: u64,
    },
    /// One execute/evaluate iteration finished.
    IterationCompleted {
        trace_id: Uuid,
        iteration: u32,
        documents_found: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        decision: Option<String>,
    },
    /// The final answer is ready.
    AnswerReady {
        trace_id: Uuid,
        duration_ms: u64,
        documents_cited: usize,
    },
}

impl AgentEvent {
    /// Namespaced event type (e.g. `"phase.started"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseStarted { .. } => "phase.started",
            Self::PhaseCompleted { .. } => "phase.completed",
            Self::TaskCompleted { .. } => "task.completed",
            Self::IterationCompleted { .. } => "iteration.completed",
            Self::AnswerReady { .. } => "answer.ready",
        }
    }

    pub fn trace_id(&self) -> Uuid {
        match self {
            Self::PhaseStarted { trace_id, .. }
            | Self::PhaseCompleted { trace_id, .. }
            | Self::TaskCompleted { trace_id, .. }
            | Self::IterationCompleted { trace_id, .. }
            | Self::AnswerReady { trace_id, .. } => *trace_id,
        }
    }
}

/// Broadcast-based event bus.
///
/// Events emitted with no active subscribers are silently dropped, and
/// subscribers that lag receive a `Lagged` error and miss events —
/// freshness matters more than completeness for progress streams.
pub struct EventBus {
    tx: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    /// Recommended capacity: 256 for production, 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers. Never fails.
    pub fn emit(&self, event: AgentEvent) {
        tracing::debug!(
            event_type = event.event_type(),
            trace_id = %event.trace_id(),
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to events. Each subscriber gets an independent stream.
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
