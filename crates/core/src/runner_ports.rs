//! Port interface for the background task runner
//!
//! The task polling driver in `tempo-infra` drives anything implementing
//! this trait; the scheduler core does not care what "pending work" means to
//! the host.

use async_trait::async_trait;
use tempo_domain::Result;

/// A unit of host-defined background processing invoked once per driver tick.
#[async_trait]
pub trait BackgroundTaskRunner: Send + Sync {
    /// Process whatever work is currently pending.
    ///
    /// Errors are logged by the driver and never stop future ticks.
    async fn run_pending(&self) -> Result<()>;
}
