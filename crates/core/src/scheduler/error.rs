//! Registry error types

use tempo_common::time::CronParseError;
use tempo_domain::TempoError;
use thiserror::Error;

/// Errors surfaced synchronously at job-registration time.
///
/// Both variants are fatal to the registration in question only; unrelated
/// jobs keep registering and running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An overlap-prevented job already exists under this dedup key.
    #[error("Duplicate dedup key: {0}")]
    DuplicateKey(String),

    /// The job's cron expression failed to parse.
    #[error(transparent)]
    Schedule(#[from] CronParseError),
}

impl From<RegistryError> for TempoError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateKey(_) => TempoError::Registry(err.to_string()),
            RegistryError::Schedule(source) => TempoError::Schedule(source.to_string()),
        }
    }
}

/// Convenience type alias for registration operations
pub type RegistryResult<T> = Result<T, RegistryError>;
