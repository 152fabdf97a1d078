//! # Tempo Infrastructure
//!
//! Runtime plumbing for the scheduler core: the polling drivers that give
//! `tempo-core` its heartbeat.
//!
//! This crate contains:
//! - The registry scan driver (ticks `JobScheduler::run_at`)
//! - The background task runner driver (ticks a `BackgroundTaskRunner`)
//! - Driver lifecycle errors
//!
//! ## Runtime rules
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on shutdown joins

pub mod scheduling;

pub use scheduling::{
    DriverError, DriverResult, ScanDriver, ScanDriverConfig, TaskRunnerDriver,
    TaskRunnerDriverConfig,
};
