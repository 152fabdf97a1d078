//! Polling drivers for the scheduler core
//!
//! The core never sleeps on its own; these drivers do. Each one owns a
//! single spawned loop that runs its tick to completion and then sleeps for
//! the configured period, so an idle host costs one timer per driver and
//! nothing else.
//!
//! All drivers follow the same lifecycle rules:
//! - Explicit start/stop with `AlreadyRunning`/`NotRunning` errors
//! - Join handles retained and awaited with a timeout on stop
//! - Cancellation observed between ticks, never mid-tick

pub mod error;
pub mod scan_driver;
pub mod task_driver;

pub use error::{DriverError, DriverResult};
pub use scan_driver::{ScanDriver, ScanDriverConfig};
pub use task_driver::{TaskRunnerDriver, TaskRunnerDriverConfig};
