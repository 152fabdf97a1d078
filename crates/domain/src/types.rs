//! Core domain types for the Tempo scheduler

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a scheduled async task.
///
/// Doubles as the dedup key of the one-shot job registered for the task, so
/// overlap prevention is enforced per task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a fresh task identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Trackable status record for one fired async task.
///
/// Created when a caller schedules work, mutated by the executing job body,
/// and read back by identity. Callers distinguish lifecycle phases purely by
/// inspecting the timestamp and error fields:
/// - `started_at` unset: not started yet
/// - `started_at` set, `completed_at` unset: running
/// - `completed_at` set: finished (non-empty `error` means failure)
///
/// Invariant: `completed_at` is set if and only if execution has finished,
/// and `started_at` precedes `completed_at` when both are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncTaskContext {
    /// Generated task identity.
    pub id: TaskId,
    /// Display name of the executor that handles this task.
    pub name: String,
    /// Human-readable description of the scheduled work.
    pub description: String,
    /// Opaque input payload handed to the executor.
    pub input: serde_json::Value,
    /// Opaque result payload produced by the executor, if any.
    pub result: Option<serde_json::Value>,
    /// Free-text status the job body may update while running.
    pub current_status: Option<String>,
    /// Units of work completed so far, if the executor reports progress.
    pub progress_current: Option<u64>,
    /// Total units of work, if the executor reports progress.
    pub progress_total: Option<u64>,
    /// When the caller requested scheduling.
    pub scheduled_at: DateTime<Utc>,
    /// When the job body began executing.
    pub started_at: Option<DateTime<Utc>>,
    /// When execution finished, success or failure.
    pub completed_at: Option<DateTime<Utc>>,
    /// Textual error summary when execution failed.
    pub error: Option<String>,
}

impl AsyncTaskContext {
    /// Create a freshly scheduled context with a generated identity.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input: serde_json::Value,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            description: description.into(),
            input,
            result: None,
            current_status: None,
            progress_current: None,
            progress_total: None,
            scheduled_at,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    /// Record the execution start time.
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
    }

    /// Record successful completion with the produced result.
    pub fn mark_succeeded(&mut self, result: serde_json::Value, now: DateTime<Utc>) {
        self.result = Some(result);
        self.completed_at = Some(now);
    }

    /// Record failed completion with a textual error summary.
    pub fn mark_failed(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.error = Some(error.into());
        self.completed_at = Some(now);
    }

    /// True once the job body has begun executing.
    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// True once execution has finished, success or failure.
    pub fn is_finished(&self) -> bool {
        self.completed_at.is_some()
    }

    /// True when execution finished with an error recorded.
    pub fn is_failed(&self) -> bool {
        self.is_finished() && self.error.as_deref().is_some_and(|e| !e.is_empty())
    }
}
