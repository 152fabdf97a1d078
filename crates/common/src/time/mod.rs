//! Time utilities and abstractions
//!
//! This module provides the time handling utilities used by the scheduler:
//! - **[`clock`]**: Clock abstractions with real and mock time for testing
//! - **[`cron`]**: Cron expression parsing and evaluation
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//!
//! use tempo_common::time::{Clock, CronSchedule, MockClock};
//!
//! // Parse a cron expression and evaluate it against a timestamp
//! let schedule = CronSchedule::parse("0 0 1 * *").unwrap();
//!
//! // Mock time for testing
//! let clock = MockClock::new();
//! clock.advance(Duration::from_secs(5));
//! let _ = schedule.is_due(&clock.now_utc());
//! ```

pub mod clock;
pub mod cron;

// Re-export commonly used items
pub use clock::{Clock, MockClock, SystemClock};
pub use cron::{CronField, CronParseError, CronSchedule};
