//! Sequential execution
//!
//! Runs every task on the calling thread in increasing id order. This is
//! the reference result that the pooled executor has to reproduce.

use std::time::Instant;

use tracing::{debug, info};

use crate::bench::aggregate::Sink;
use crate::bench::workload::{run_task, TaskId};

/// Single-threaded executor
#[derive(Debug, Clone)]
pub struct SequentialExecutor {
    block_size: usize,
}

impl SequentialExecutor {
    /// Create an executor producing blocks of `block_size` bytes
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }

    /// Size of each generated block in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Execute tasks `0..task_count` in order and fold their digests
    pub fn run(&self, task_count: u64) -> Sink {
        let start = Instant::now();
        info!(
            task_count,
            block_size = self.block_size,
            "Starting sequential run"
        );

        let mut sink = Sink::new();
        for id in 0..task_count {
            let digest = run_task(id as TaskId, self.block_size);
            sink.absorb(&digest);
        }

        debug!(
            sink = sink.value(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Sequential run finished"
        );
        sink
    }
}
