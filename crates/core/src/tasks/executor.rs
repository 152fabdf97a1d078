//! Executor port and registry for async tasks

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tempo_domain::{AsyncTaskContext, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle an executor uses to report progress on its status record and to
/// observe cooperative cancellation.
///
/// Updates are visible immediately to anyone reading the task back by id.
#[derive(Clone)]
pub struct TaskProgress {
    slot: Arc<RwLock<AsyncTaskContext>>,
    cancellation: CancellationToken,
}

impl TaskProgress {
    pub(crate) fn new(
        slot: Arc<RwLock<AsyncTaskContext>>,
        cancellation: CancellationToken,
    ) -> Self {
        Self { slot, cancellation }
    }

    /// Record units of work completed out of a total.
    pub fn set_progress(&self, current: u64, total: u64) {
        let mut ctx = self.slot.write();
        ctx.progress_current = Some(current);
        ctx.progress_total = Some(total);
    }

    /// Update the free-text status line.
    pub fn set_status(&self, status: impl Into<String>) {
        self.slot.write().current_status = Some(status.into());
    }

    /// Token resolved when shutdown or cancellation has been requested.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// A named unit of executable work.
///
/// Implementations are registered by name; scheduling a task with that name
/// runs `execute` once on a detached job. Errors returned here are captured
/// into the task's status record, never propagated to the caller that
/// scheduled the task.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Registry name callers schedule against.
    fn name(&self) -> &str;

    /// Run the work. The returned value becomes the task's result payload.
    async fn execute(&self, input: serde_json::Value, progress: TaskProgress)
        -> Result<serde_json::Value>;
}

/// Explicit name-to-executor lookup table.
///
/// Registration is first class: an executor must be registered under its
/// name before any task naming it can be scheduled.
#[derive(Default)]
pub struct ExecutorRegistry {
    executors: DashMap<String, Arc<dyn TaskExecutor>>,
}

impl ExecutorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under its own name, replacing any previous one.
    pub fn register(&self, executor: Arc<dyn TaskExecutor>) {
        let name = executor.name().to_string();
        debug!(%name, "Registered task executor");
        self.executors.insert(name, executor);
    }

    /// Look up an executor by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskExecutor>> {
        self.executors.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered executors.
    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }
}

impl std::fmt::Debug for ExecutorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutorRegistry").field("len", &self.len()).finish()
    }
}
