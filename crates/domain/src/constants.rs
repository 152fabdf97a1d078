//! Application constants
//!
//! Centralized location for all domain-level constants used by the scheduler
//! core and its polling drivers.

// Polling driver configuration
pub const DEFAULT_SCAN_PERIOD_MS: u64 = 1_000;
pub const DEFAULT_TASK_RUNNER_PERIOD_MS: u64 = 1_000;

// Shutdown draining
pub const DRAIN_POLL_INTERVAL_MS: u64 = 50;
pub const DEFAULT_DRAIN_TIMEOUT_SECS: u64 = 30;

// Async task registry retention
pub const DEFAULT_TASK_RETENTION_SECS: u64 = 3_600;
