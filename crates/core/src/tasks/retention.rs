//! Retention runner for finished task records

use std::time::Duration;

use async_trait::async_trait;
use tempo_domain::constants::DEFAULT_TASK_RETENTION_SECS;
use tempo_domain::Result;
use tracing::debug;

use crate::runner_ports::BackgroundTaskRunner;
use crate::tasks::service::TaskService;

/// Periodic eviction of finished task records past their retention window.
///
/// Plugged into a task polling driver; each tick drops records that
/// finished longer than `retention` ago.
pub struct TaskRetentionRunner {
    service: TaskService,
    retention: Duration,
}

impl TaskRetentionRunner {
    /// Create a runner with the default retention window.
    pub fn new(service: TaskService) -> Self {
        Self::with_retention(service, Duration::from_secs(DEFAULT_TASK_RETENTION_SECS))
    }

    /// Create a runner keeping finished records for `retention`.
    pub fn with_retention(service: TaskService, retention: Duration) -> Self {
        Self { service, retention }
    }
}

#[async_trait]
impl BackgroundTaskRunner for TaskRetentionRunner {
    async fn run_pending(&self) -> Result<()> {
        let evicted = self.service.evict_completed(self.retention);
        if evicted > 0 {
            debug!(evicted, "Retention pass evicted task records");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tempo_common::time::MockClock;
    use tempo_domain::AsyncTaskContext;

    use super::*;
    use crate::scheduler::JobScheduler;
    use crate::tasks::executor::{TaskExecutor, TaskProgress};

    struct Noop;

    #[async_trait]
    impl TaskExecutor for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        async fn execute(
            &self,
            _input: serde_json::Value,
            _progress: TaskProgress,
        ) -> Result<serde_json::Value> {
            Ok(json!(null))
        }
    }

    async fn wait_finished(service: &TaskService, id: tempo_domain::TaskId) -> AsyncTaskContext {
        for _ in 0..200 {
            if let Some(ctx) = service.get_task(id) {
                if ctx.is_finished() {
                    return ctx;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task did not finish within 2s");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn run_pending_applies_the_retention_window() {
        let clock = MockClock::new();
        let scheduler = JobScheduler::new();
        let service = TaskService::with_clock(scheduler.clone(), Arc::new(clock.clone()));
        service.register_executor(Arc::new(Noop));

        let id = service.schedule_task("noop", "", json!(null)).unwrap();
        scheduler.run_at(chrono::Utc::now());
        wait_finished(&service, id).await;

        let runner =
            TaskRetentionRunner::with_retention(service.clone(), Duration::from_secs(60));

        // Within the window: kept.
        runner.run_pending().await.unwrap();
        assert_eq!(service.task_count(), 1);

        // Past the window: evicted.
        clock.advance(Duration::from_secs(120));
        runner.run_pending().await.unwrap();
        assert_eq!(service.task_count(), 0);
    }
}
