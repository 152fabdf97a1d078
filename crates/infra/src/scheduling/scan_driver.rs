//! Registry scan driver.
//!
//! Gives a [`JobScheduler`] its heartbeat: a background loop that sleeps for
//! the scan period, reads the clock, and hands the timestamp to
//! [`JobScheduler::run_at`]. The loop itself never does job work, so a tick
//! costs one registry pass regardless of how slow the dispatched bodies are.
//!
//! Shutdown drains: after the loop is cancelled, in-flight job bodies get a
//! cooperative cancellation request and the driver polls the scheduler until
//! they finish or the drain timeout elapses.
//!
//! # Example
//!
//! ```no_run
//! use tempo_core::JobScheduler;
//! use tempo_infra::scheduling::{ScanDriver, ScanDriverConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = JobScheduler::new();
//! // ... register jobs ...
//! let mut driver = ScanDriver::new(scheduler, ScanDriverConfig::default());
//!
//! driver.start().await?;
//! // ... application runs ...
//! driver.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tempo_common::time::{Clock, SystemClock};
use tempo_core::JobScheduler;
use tempo_domain::constants::{
    DEFAULT_DRAIN_TIMEOUT_SECS, DEFAULT_SCAN_PERIOD_MS, DRAIN_POLL_INTERVAL_MS,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::scheduling::error::{DriverError, DriverResult};

/// Type alias for task handle to avoid complexity warnings
type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the scan driver
#[derive(Debug, Clone)]
pub struct ScanDriverConfig {
    /// Pause between registry scans
    pub scan_period: Duration,
    /// How long `stop` waits for in-flight job bodies to finish
    pub drain_timeout: Duration,
}

impl Default for ScanDriverConfig {
    fn default() -> Self {
        Self {
            scan_period: Duration::from_millis(DEFAULT_SCAN_PERIOD_MS),
            drain_timeout: Duration::from_secs(DEFAULT_DRAIN_TIMEOUT_SECS),
        }
    }
}

/// Polling driver for the job registry
pub struct ScanDriver {
    scheduler: JobScheduler,
    clock: Arc<dyn Clock>,
    config: ScanDriverConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl ScanDriver {
    /// Create a driver over `scheduler`, reading the system clock.
    pub fn new(scheduler: JobScheduler, config: ScanDriverConfig) -> Self {
        Self::with_clock(scheduler, config, Arc::new(SystemClock))
    }

    /// Create a driver with an injected clock.
    pub fn with_clock(
        scheduler: JobScheduler,
        config: ScanDriverConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler,
            clock,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Start the scan loop.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::AlreadyRunning`] if the loop is active.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> DriverResult<()> {
        if self.is_running() {
            return Err(DriverError::AlreadyRunning);
        }

        info!("Starting registry scan driver");

        // Create a new cancellation token (supports restart after stop)
        self.cancellation_token = CancellationToken::new();

        let scheduler = self.scheduler.clone();
        let clock = Arc::clone(&self.clock);
        let period = self.config.scan_period;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::scan_loop(scheduler, clock, period, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);

        info!(period_ms = self.config.scan_period.as_millis() as u64, "Registry scan driver started");
        Ok(())
    }

    /// Stop the scan loop and drain in-flight job bodies.
    ///
    /// Cancels the loop, requests cooperative cancellation of every running
    /// body, then waits up to the drain timeout for the scheduler to go
    /// idle. Bodies still running at the deadline are left to finish on
    /// their own and a warning is logged.
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

        info!("Stopping registry scan driver");

        // Cancel the loop first so no new scans dispatch more work
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            tokio::time::timeout(JOIN_TIMEOUT, handle)
                .await
                .map_err(|source| DriverError::Timeout { duration: JOIN_TIMEOUT, source })??;
        }

        self.scheduler.cancel_all_cancellable_tasks();
        if self.scheduler.is_running() {
            warn!(
                in_flight = self.scheduler.in_flight(),
                "Job bodies still running at shutdown; waiting for them to drain"
            );
        }
        self.drain().await;

        info!("Registry scan driver stopped");
        Ok(())
    }

    /// Check if the scan loop is active
    ///
    /// The driver is considered running if it has a loop task handle that
    /// hasn't finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Poll the scheduler until in-flight bodies finish or the drain
    /// timeout elapses.
    async fn drain(&self) {
        let deadline = tokio::time::Instant::now() + self.config.drain_timeout;
        while self.scheduler.is_running() {
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    in_flight = self.scheduler.in_flight(),
                    "Drain timeout elapsed with job bodies still running"
                );
                return;
            }
            tokio::time::sleep(Duration::from_millis(DRAIN_POLL_INTERVAL_MS)).await;
        }
        debug!("All job bodies drained");
    }

    /// Background scan loop: sleep, then run one full registry pass.
    async fn scan_loop(
        scheduler: JobScheduler,
        clock: Arc<dyn Clock>,
        period: Duration,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Scan loop cancelled");
                    break;
                }
                _ = tokio::time::sleep(period) => {
                    let dispatched = scheduler.run_at(clock.now_utc());
                    if dispatched > 0 {
                        debug!(dispatched, "Registry scan dispatched jobs");
                    }
                }
            }
        }
    }
}

/// Ensure the loop is cancelled when dropped
impl Drop for ScanDriver {
    fn drop(&mut self) {
        // Best-effort cleanup; can't await the handle here
        if !self.cancellation_token.is_cancelled() {
            warn!("ScanDriver dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> ScanDriverConfig {
        ScanDriverConfig {
            scan_period: Duration::from_millis(10),
            drain_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_driver_lifecycle() {
        let mut driver = ScanDriver::new(JobScheduler::new(), short_config());

        // Initially not running
        assert!(!driver.is_running());

        // Start succeeds
        driver.start().await.unwrap();
        assert!(driver.is_running());

        // Stop succeeds
        driver.stop().await.unwrap();
        assert!(!driver.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_double_start_fails() {
        let mut driver = ScanDriver::new(JobScheduler::new(), short_config());

        driver.start().await.unwrap();

        // Second start should fail
        let result = driver.start().await;
        assert!(matches!(result, Err(DriverError::AlreadyRunning)));

        driver.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stop_without_start_fails() {
        let mut driver = ScanDriver::new(JobScheduler::new(), short_config());

        let result = driver.stop().await;
        assert!(matches!(result, Err(DriverError::NotRunning)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_restart_after_stop() {
        let mut driver = ScanDriver::new(JobScheduler::new(), short_config());

        driver.start().await.unwrap();
        driver.stop().await.unwrap();

        // A fresh token is issued, so the loop runs again
        driver.start().await.unwrap();
        assert!(driver.is_running());
        driver.stop().await.unwrap();
    }
}
