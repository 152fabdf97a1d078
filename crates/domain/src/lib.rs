//! # Tempo Domain
//!
//! Business domain types and models for the Tempo scheduler.
//!
//! This crate contains:
//! - Domain data types (TaskId, AsyncTaskContext)
//! - Domain error types and Result definitions
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Tempo crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::*;
pub use types::*;
