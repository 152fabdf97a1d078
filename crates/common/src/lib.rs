//! Modular common utilities shared across Tempo crates.
//!
//! # Safety and Quality
//!
//! This crate enforces strict safety and quality standards to ensure
//! reliability across all Tempo components.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod time;

// Re-export commonly used types and traits for convenience
pub use time::{Clock, CronField, CronParseError, CronSchedule, MockClock, SystemClock};
