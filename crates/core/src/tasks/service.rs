//! Task service: schedule, track, and evict async tasks
//!
//! [`TaskService`] turns a named executor invocation into a trackable
//! one-shot job: it creates the status record, registers a `Once` job under
//! the task id, and exposes the record for polling by id. Executor failures
//! are captured into the record; the scheduling caller never sees them.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use dashmap::DashMap;
use parking_lot::RwLock;
use tempo_common::time::{Clock, SystemClock};
use tempo_domain::{AsyncTaskContext, Result, TaskId, TempoError};
use tracing::{debug, instrument};

use crate::scheduler::job::{JobContext, JobDescriptor, JobFn};
use crate::scheduler::trigger::TriggerPolicy;
use crate::scheduler::JobScheduler;
use crate::tasks::executor::{ExecutorRegistry, TaskExecutor, TaskProgress};

/// Schedules async tasks and tracks their status records.
///
/// Cheap to clone; clones share the same record store, executor registry,
/// and backing scheduler.
#[derive(Clone)]
pub struct TaskService {
    clock: Arc<dyn Clock>,
    scheduler: JobScheduler,
    executors: Arc<ExecutorRegistry>,
    tasks: Arc<DashMap<TaskId, Arc<RwLock<AsyncTaskContext>>>>,
}

impl TaskService {
    /// Create a service dispatching through `scheduler`, on the system
    /// clock.
    pub fn new(scheduler: JobScheduler) -> Self {
        Self::with_clock(scheduler, Arc::new(SystemClock))
    }

    /// Create a service with an injected clock.
    pub fn with_clock(scheduler: JobScheduler, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            scheduler,
            executors: Arc::new(ExecutorRegistry::new()),
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Register an executor under its own name.
    pub fn register_executor(&self, executor: Arc<dyn TaskExecutor>) {
        self.executors.register(executor);
    }

    /// Schedule a task for the executor registered under `name`.
    ///
    /// The task runs on the backing scheduler's next scan. The returned id
    /// is also the job's dedup key, so one task identity never has two
    /// executions in flight.
    ///
    /// # Errors
    ///
    /// Returns [`TempoError::NotFound`] when no executor is registered under
    /// `name`. Executor failures are not errors here; they surface on the
    /// status record.
    #[instrument(skip(self, description, input))]
    pub fn schedule_task(
        &self,
        name: &str,
        description: &str,
        input: serde_json::Value,
    ) -> Result<TaskId> {
        let executor = self
            .executors
            .get(name)
            .ok_or_else(|| TempoError::NotFound(format!("no executor registered under '{name}'")))?;

        let context = AsyncTaskContext::new(name, description, input.clone(), self.clock.now_utc());
        let id = context.id;
        let slot = Arc::new(RwLock::new(context));
        self.tasks.insert(id, Arc::clone(&slot));

        let clock = Arc::clone(&self.clock);
        let body = move |job_ctx: JobContext| {
            let executor = Arc::clone(&executor);
            let slot = Arc::clone(&slot);
            let clock = Arc::clone(&clock);
            let input = input.clone();
            async move { execute_into_record(executor, slot, clock, input, job_ctx).await }
        };

        let registered = self.scheduler.register_job(JobDescriptor::new(
            id.to_string(),
            TriggerPolicy::Once,
            true,
            Arc::new(JobFn::new(body)),
        ));
        if let Err(err) = registered {
            self.tasks.remove(&id);
            return Err(err.into());
        }

        debug!(task_id = %id, "Scheduled task");
        Ok(id)
    }

    /// Snapshot of a task's status record, if it is still retained.
    pub fn get_task(&self, id: TaskId) -> Option<AsyncTaskContext> {
        self.tasks.get(&id).map(|slot| slot.read().clone())
    }

    /// Number of retained status records.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Drop finished records whose completion is older than `max_age`.
    ///
    /// Unfinished tasks are always retained. Returns the number of records
    /// evicted.
    #[instrument(skip(self))]
    pub fn evict_completed(&self, max_age: Duration) -> usize {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let Some(cutoff) = self.clock.now_utc().checked_sub_signed(max_age) else {
            return 0;
        };

        let before = self.tasks.len();
        self.tasks.retain(|_, slot| match slot.read().completed_at {
            Some(done) => done > cutoff,
            None => true,
        });
        let evicted = before - self.tasks.len();
        if evicted > 0 {
            debug!(evicted, "Evicted completed task records");
        }
        evicted
    }
}

/// Run the executor on its own task and fold the outcome into the status
/// record. Always returns `Ok`: failure is a property of the record, not of
/// the job dispatch.
async fn execute_into_record(
    executor: Arc<dyn TaskExecutor>,
    slot: Arc<RwLock<AsyncTaskContext>>,
    clock: Arc<dyn Clock>,
    input: serde_json::Value,
    job_ctx: JobContext,
) -> Result<()> {
    slot.write().mark_started(clock.now_utc());

    let progress = TaskProgress::new(Arc::clone(&slot), job_ctx.cancellation_token().clone());
    let outcome = tokio::spawn(async move { executor.execute(input, progress).await }).await;

    let now = clock.now_utc();
    let mut record = slot.write();
    match outcome {
        Ok(Ok(result)) => record.mark_succeeded(result, now),
        Ok(Err(err)) => record.mark_failed(err.to_string(), now),
        Err(join_err) if join_err.is_panic() => record.mark_failed("executor panicked", now),
        Err(join_err) => record.mark_failed(join_err.to_string(), now),
    }
    Ok(())
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService").field("task_count", &self.task_count()).finish()
    }
}
