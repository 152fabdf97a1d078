//! Driver error types

use std::time::Duration;

use tempo_domain::TempoError;
use thiserror::Error;

/// Lifecycle errors for the polling drivers
#[derive(Debug, Error)]
pub enum DriverError {
    /// Driver is already running
    #[error("Driver already running")]
    AlreadyRunning,

    /// Driver is not running
    #[error("Driver not running")]
    NotRunning,

    /// Shutdown join timed out
    #[error("Driver loop did not stop within {duration:?}")]
    Timeout {
        duration: Duration,
        #[source]
        source: tokio::time::error::Elapsed,
    },

    /// Driver loop task failed to join
    #[error("Driver loop join failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<DriverError> for TempoError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::AlreadyRunning | DriverError::NotRunning => {
                TempoError::InvalidInput(err.to_string())
            }
            DriverError::Timeout { .. } | DriverError::Join(_) => {
                TempoError::Internal(err.to_string())
            }
        }
    }
}

/// Convenience type alias for driver operations
pub type DriverResult<T> = Result<T, DriverError>;
