//! Background task runner driver.
//!
//! Drives anything implementing [`BackgroundTaskRunner`] on a fixed cadence:
//! sleep for the period, call `run_pending` to completion, repeat. Runner
//! errors are logged and never stop the loop.

use std::sync::Arc;
use std::time::Duration;

use tempo_core::BackgroundTaskRunner;
use tempo_domain::constants::DEFAULT_TASK_RUNNER_PERIOD_MS;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{DriverError, DriverResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the task runner driver
#[derive(Debug, Clone)]
pub struct TaskRunnerDriverConfig {
    /// Pause between `run_pending` invocations
    pub period: Duration,
}

impl Default for TaskRunnerDriverConfig {
    fn default() -> Self {
        Self { period: Duration::from_millis(DEFAULT_TASK_RUNNER_PERIOD_MS) }
    }
}

/// Polling driver for a background task runner
pub struct TaskRunnerDriver {
    runner: Arc<dyn BackgroundTaskRunner>,
    config: TaskRunnerDriverConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl TaskRunnerDriver {
    /// Create a driver over `runner`.
    pub fn new(runner: Arc<dyn BackgroundTaskRunner>, config: TaskRunnerDriverConfig) -> Self {
        Self {
            runner,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the runner loop.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::AlreadyRunning`] if the loop is active.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> DriverResult<()> {
        if self.is_running() {
            return Err(DriverError::AlreadyRunning);
        }

        info!("Starting task runner driver");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let runner = Arc::clone(&self.runner);
        let period = self.config.period;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::runner_loop(runner, period, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!(period_ms = self.config.period.as_millis() as u64, "Task runner driver started");
        Ok(())
    }

    /// Stop the runner loop.
    ///
    /// A tick in progress runs to completion before the loop exits.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::NotRunning`] if the loop is not active, or a
    /// join error if the loop task failed.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> DriverResult<()> {
        if !self.is_running() {
            return Err(DriverError::NotRunning);
        }

        info!("Stopping task runner driver");

        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(JOIN_TIMEOUT, handle)
                .await
                .map_err(|source| DriverError::Timeout { duration: JOIN_TIMEOUT, source })??;
        }

        info!("Task runner driver stopped");
        Ok(())
    }

    /// Check if the runner loop is active
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Background runner loop: sleep, then run one tick to completion.
    async fn runner_loop(
        runner: Arc<dyn BackgroundTaskRunner>,
        period: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Runner loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(period) => {
                    if let Err(e) = runner.run_pending().await {
                        error!(error = %e, "Background task runner tick failed");
                    }
                }
            }
        }
    }
}

/// Ensure the loop is cancelled when dropped
impl Drop for TaskRunnerDriver {
    fn drop(&mut self) {
        // Best-effort cleanup; can't await the handle here
        if !self.cancellation_token.is_cancelled() {
            warn!("TaskRunnerDriver dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
