//! asyncro - parallel suite runner for Robot Framework style engines
//!
//! Suites are discovered with an engine dry run, executed one process per
//! suite on a bounded worker pool, and merged into a single report.

pub mod cli;
pub mod common;
pub mod engine;
pub mod merge;
pub mod options;
pub mod pool;
pub mod runner;
pub mod suite;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use runner::RunSummary;
