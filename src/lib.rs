//! CPUBENCH - CPU scheduling benchmark
//!
//! Measures the throughput of a synthetic generate-then-hash workload run
//! either strictly sequentially or across a bounded worker pool, so the two
//! scheduling strategies can be compared on the same machine.

use thiserror::Error;

pub mod bench;
pub mod config;
pub mod metrics;
pub mod models;
pub mod profiler;
pub mod util;

/// Errors produced by the benchmark engine and its collaborators
#[derive(Debug, Error)]
pub enum BenchError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Configuration validation or parsing error
    #[error("Configuration error: {0}")]
    Config(String),
    /// Execution mode selector did not name a known strategy
    #[error("Unknown execution mode '{0}' (expected 'single' or 'pool')")]
    UnknownMode(String),
    /// A worker, dispatcher or join-waiter failed during a pooled run
    #[error("Worker error: {0}")]
    Worker(String),
    /// Async runtime could not be created
    #[error("Runtime error: {0}")]
    Runtime(String),
    /// Report or profile could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Profiling harness misuse or output failure
    #[error("Profiler error: {0}")]
    Profiler(String),
    /// Metrics exporter failed to bind or serve
    #[error("Metrics server error: {0}")]
    Metrics(String),
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Serialization(format!("JSON serialization error: {}", err))
    }
}

impl From<toml::de::Error> for BenchError {
    fn from(err: toml::de::Error) -> Self {
        BenchError::Config(format!("TOML parsing error: {}", err))
    }
}

/// Result type alias for CPUBENCH operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Error reporting helpers for the command line
pub mod error {
    use super::BenchError;

    /// Convert error to user-friendly message with suggestions
    pub fn user_friendly_message(error: &BenchError) -> String {
        match error {
            BenchError::UnknownMode(mode) => {
                format!("Unknown mode '{}'. Use --mode single or --mode pool.", mode)
            }
            BenchError::Config(msg) => {
                format!("Configuration error: {}. Check your flags, environment and config file.", msg)
            }
            BenchError::Worker(msg) => {
                format!("The worker pool failed and the run was aborted: {}", msg)
            }
            BenchError::Metrics(msg) => {
                format!("Metrics server could not start: {}. Is the port already in use?", msg)
            }
            _ => error.to_string(),
        }
    }

    /// Process exit code for an error
    pub fn exit_code(error: &BenchError) -> i32 {
        match error {
            BenchError::Config(_) | BenchError::UnknownMode(_) => 2,
            _ => 1,
        }
    }
}

// Common types and constants
pub const APP_NAME: &str = "cpubench";
pub const CONFIG_FILE: &str = "cpubench.toml";
pub const PROFILE_FILE: &str = "profile.json";

/// Version of this build
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit this build was made from, injected at build time when available
pub const COMMIT: &str = match option_env!("CPUBENCH_GIT_COMMIT") {
    Some(commit) => commit,
    None => "none",
};
