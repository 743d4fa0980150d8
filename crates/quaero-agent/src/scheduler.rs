//! Worker pool: DAG-aware task execution with bounded parallelism.
//!
//! Tasks declare dependencies by id. Each round, every task whose
//! dependencies have completed becomes ready and runs concurrently up
//! to `max_workers`; dependents wait for the next round. A dependency
//! cycle is broken deterministically by forcing the first pending task
//! to run, logged as an error condition rather than a fatal one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use quaero_core::{TaskDefinition, WorkerResult};

use crate::tasks::{self, TaskRuntime};

/// Per-task completion callback for progress streaming. Errors are
/// logged and swallowed, never propagated into the batch.
pub type CompletionCallback<'a> = dyn Fn(&WorkerResult) -> quaero_core::Result<()> + Send + Sync + 'a;

/// Execute a batch of tasks respecting `depends_on`, returning exactly
/// one result per input task, in input order.
///
/// `prior` carries results from earlier iterations for the LLM-backed
/// task kinds; results completed in this batch are appended to it as
/// rounds finish, so dependents see their dependencies' output.
#[instrument(skip_all, fields(
    subsystem = "scheduler",
    component = "worker_pool",
    op = "execute",
    task_count = tasks.len(),
))]
pub async fn execute_tasks(
    runtime: Arc<TaskRuntime>,
    tasks: Vec<TaskDefinition>,
    prior: Vec<WorkerResult>,
    on_complete: Option<&CompletionCallback<'_>>,
) -> Vec<WorkerResult> {
    let input_order: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
    let mut pending = tasks;
    let mut completed: HashMap<String, WorkerResult> = HashMap::new();
    let mut context = prior;
    let semaphore = Arc::new(Semaphore::new(runtime.config.max_workers));

    while !pending.is_empty() {
        // Ready set: every dependency id resolved.
        let (ready, rest): (Vec<TaskDefinition>, Vec<TaskDefinition>) = pending
            .into_iter()
            .partition(|t| t.depends_on.iter().all(|dep| completed.contains_key(dep)));
        pending = rest;

        let mut batch = if ready.is_empty() {
            // Nothing ready but work remains: dependency cycle (or a
            // reference to a task that does not exist). Break it by
            // forcing the first pending task.
            let forced = pending.remove(0);
            error!(
                task_id = %forced.id,
                depends_on = ?forced.depends_on,
                "Dependency cycle detected, forcing task to run"
            );
            vec![forced]
        } else {
            ready
        };
        // Higher-priority tasks claim worker slots first.
        batch.sort_by_key(|t| std::cmp::Reverse(t.priority));

        let mut join_set: JoinSet<WorkerResult> = JoinSet::new();
        let mut spawned: HashMap<tokio::task::Id, TaskDefinition> = HashMap::new();
        for task in batch {
            let runtime = runtime.clone();
            let semaphore = semaphore.clone();
            let context = context.clone();
            let task_clone = task.clone();
            let handle = join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return WorkerResult::failed(&task_clone, "worker pool closed", 0),
                };
                tasks::execute_task(&runtime, &task_clone, &context).await
            });
            spawned.insert(handle.id(), task);
        }

        while let Some(joined) = join_set.join_next_with_id().await {
            let result = match joined {
                Ok((id, result)) => {
                    spawned.remove(&id);
                    result
                }
                Err(join_error) => {
                    // A panicking task is converted into a failed
                    // result; the batch carries on.
                    let task = spawned.remove(&join_error.id());
                    error!(error = %join_error, "Worker task panicked");
                    match task {
                        Some(task) => {
                            WorkerResult::failed(&task, format!("task panicked: {join_error}"), 0)
                        }
                        None => continue,
                    }
                }
            };

            if let Some(callback) = on_complete {
                if let Err(e) = callback(&result) {
                    warn!(task_id = %result.task_id, error = %e, "Completion callback failed");
                }
            }
            debug!(task_id = %result.task_id, success = result.success, "Task joined");
            context.push(result.clone());
            completed.insert(result.task_id.clone(), result);
        }
    }

    input_order
        .iter()
        .filter_map(|id| completed.remove(id))
        .collect()
}
