//! Data models for mysql-easier.
//!
//! This module re-exports the value types shared by statements, sessions and
//! connections.

pub mod fields;
pub mod query;

// Re-export commonly used types
pub use fields::Fields;
pub use query::{MutationSummary, QueryOutcome, QueryParam, Row};
