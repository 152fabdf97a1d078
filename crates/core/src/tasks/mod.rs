//! Async task wrapper: trackable one-shot executions
//!
//! Callers schedule named work through [`TaskService`]; the service creates
//! an [`tempo_domain::AsyncTaskContext`] status record, registers a one-shot
//! job keyed by the task id, and lets the executing body update the record
//! in place. Executors are looked up in an explicit [`executor::ExecutorRegistry`];
//! nothing is discovered by naming convention.

pub mod executor;
pub mod retention;
pub mod service;

pub use executor::{ExecutorRegistry, TaskExecutor, TaskProgress};
pub use retention::TaskRetentionRunner;
pub use service::TaskService;
