//! Benchmark engine module
//!
//! Contains the synthetic workload, the digest aggregation, the two
//! execution strategies and the runner that dispatches between them.

pub mod aggregate;
pub mod runner;
pub mod sequential;
pub mod worker;
pub mod workload;

// Re-export commonly used types
pub use aggregate::{fold_digests, Sink};
pub use runner::Runner;
pub use sequential::SequentialExecutor;
pub use worker::{PooledExecutor, WorkerReport};
pub use workload::{digest, generate_block, run_task, Digest, TaskId};
