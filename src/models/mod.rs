//! Data models module
//!
//! Contains the run result returned by the engine and the report
//! structures used for display and metrics.

pub mod result;

// Re-export commonly used types
pub use result::{BenchmarkReport, RunResult, SystemInfo};
