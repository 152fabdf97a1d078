//! # Tempo Core
//!
//! Pure scheduling logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The job registry and scheduler core (due-job selection, overlap
//!   prevention, fire-and-continue dispatch)
//! - Trigger policies (cron, fixed interval, one-shot)
//! - The async task wrapper and its executor ports
//!
//! ## Architecture Principles
//! - Only depends on `tempo-common` and `tempo-domain`
//! - No timers or polling loops here; drivers live in `tempo-infra`
//! - External work enters via traits (`JobRun`, `TaskExecutor`,
//!   `BackgroundTaskRunner`)

pub mod runner_ports;
pub mod scheduler;
pub mod tasks;

// Re-export specific items to avoid ambiguity
pub use runner_ports::BackgroundTaskRunner;
pub use scheduler::error::RegistryError;
pub use scheduler::job::{JobContext, JobDescriptor, JobFn, JobRun};
pub use scheduler::trigger::TriggerPolicy;
pub use scheduler::JobScheduler;
pub use tasks::executor::{ExecutorRegistry, TaskExecutor, TaskProgress};
pub use tasks::retention::TaskRetentionRunner;
pub use tasks::TaskService;
