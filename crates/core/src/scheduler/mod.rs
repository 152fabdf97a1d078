//! Scheduler core: job registry, trigger evaluation, and dispatch
//!
//! The [`JobScheduler`] owns the registry of job descriptors and implements
//! the per-tick scan: evaluate every registered job against a supplied
//! timestamp, dispatch the due-and-eligible ones on independent tasks, and
//! track key-scoped run state so a dedup key never has two overlapping
//! executions in flight.

pub mod error;
pub mod job;
pub mod service;
pub mod trigger;

pub use error::RegistryError;
pub use job::{JobContext, JobDescriptor, JobFn, JobRun};
pub use service::JobScheduler;
pub use trigger::TriggerPolicy;
