//! Mode dispatch
//!
//! `Runner` is the entry point of the engine: it looks at the configured
//! mode, hands the run to the matching executor and wraps the sink.

use std::time::Instant;

use tokio::runtime::{Builder, Handle};
use tracing::{debug, info, warn};

use crate::bench::sequential::SequentialExecutor;
use crate::bench::worker::PooledExecutor;
use crate::config::{BenchmarkConfig, ExecutionMode, Mode};
use crate::models::result::RunResult;
use crate::{BenchError, Result};

/// Dispatches a configuration to the executor it names
#[derive(Debug, Clone, Default)]
pub struct Runner;

impl Runner {
    pub fn new() -> Self {
        Self
    }

    /// Run the benchmark described by `config`, blocking until it finishes.
    ///
    /// Pooled runs drive their own single-threaded runtime. When called from a
    /// thread that already belongs to a tokio runtime, that runtime is built and
    /// driven on a scoped thread instead, since `block_on` cannot nest. Async
    /// callers should prefer [`Runner::run_async`], which does not block them.
    /// An unrecognized mode runs nothing and yields a zero sink with no executor.
    pub fn run(&self, config: &BenchmarkConfig) -> Result<RunResult> {
        match &config.mode {
            Mode::Sequential => Ok(self.run_sequential(config)),
            Mode::Pooled if Handle::try_current().is_ok() => {
                debug!("Inside a tokio runtime, driving pooled run from a scoped thread");
                std::thread::scope(|scope| {
                    scope
                        .spawn(|| self.block_on_pooled(config))
                        .join()
                        .unwrap_or_else(|_| {
                            Err(BenchError::Runtime("pooled run thread panicked".to_string()))
                        })
                })
            }
            Mode::Pooled => self.block_on_pooled(config),
            Mode::Unrecognized(raw) => Ok(Self::skip(raw)),
        }
    }

    /// Async variant of [`Runner::run`] for callers already on a tokio runtime.
    ///
    /// The sequential executor is moved to a blocking thread so the caller's
    /// runtime keeps making progress.
    pub async fn run_async(&self, config: &BenchmarkConfig) -> Result<RunResult> {
        match &config.mode {
            Mode::Sequential => {
                let runner = self.clone();
                let config = config.clone();
                tokio::task::spawn_blocking(move || runner.run_sequential(&config))
                    .await
                    .map_err(|e| BenchError::Worker(format!("Sequential run failed: {}", e)))
            }
            Mode::Pooled => self.run_pooled(config).await,
            Mode::Unrecognized(raw) => Ok(Self::skip(raw)),
        }
    }

    fn run_sequential(&self, config: &BenchmarkConfig) -> RunResult {
        let start = Instant::now();
        let sink = SequentialExecutor::new(config.block_size).run(config.task_count);
        info!(
            mode = %ExecutionMode::Sequential,
            sink = sink.value(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Run complete"
        );
        RunResult::executed(ExecutionMode::Sequential, sink)
    }

    fn block_on_pooled(&self, config: &BenchmarkConfig) -> Result<RunResult> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| BenchError::Runtime(format!("Failed to build runtime: {}", e)))?;
        runtime.block_on(self.run_pooled(config))
    }

    async fn run_pooled(&self, config: &BenchmarkConfig) -> Result<RunResult> {
        let start = Instant::now();
        let executor = PooledExecutor::new(config.block_size, config.worker_count)?;
        let sink = executor.run(config.task_count).await?;
        info!(
            mode = %ExecutionMode::Pooled,
            workers = executor.worker_count(),
            sink = sink.value(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Run complete"
        );
        Ok(RunResult::executed(ExecutionMode::Pooled, sink))
    }

    fn skip(raw: &str) -> RunResult {
        warn!(mode = raw, "Unrecognized mode, nothing was run");
        RunResult::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOLDEN_SINK: u8 = 104;

    #[test]
    fn test_sequential_dispatch() {
        let result = Runner::new()
            .run(&BenchmarkConfig::sequential(5, 1024))
            .unwrap();
        assert_eq!(result.sink, GOLDEN_SINK);
        assert_eq!(result.executor, Some(ExecutionMode::Sequential));
        assert_eq!(result.tasks_completed, 5);
    }

    #[test]
    fn test_pooled_dispatch() {
        for workers in [1, 4] {
            let result = Runner::new()
                .run(&BenchmarkConfig::pooled(5, 1024, workers))
                .unwrap();
            assert_eq!(result.sink, GOLDEN_SINK, "workers={}", workers);
            assert_eq!(result.executor, Some(ExecutionMode::Pooled));
            assert_eq!(result.tasks_completed, 5);
        }
    }

    #[test]
    fn test_zero_tasks_both_modes() {
        let runner = Runner::new();
        assert_eq!(runner.run(&BenchmarkConfig::sequential(0, 1024)).unwrap().sink, 0);
        assert_eq!(runner.run(&BenchmarkConfig::pooled(0, 1024, 3)).unwrap().sink, 0);
    }

    #[test]
    fn test_unrecognized_mode_yields_empty_result() {
        let config = BenchmarkConfig::sequential(5, 1024).with_mode(Mode::from("turbo"));
        let result = Runner::new().run(&config).unwrap();
        assert_eq!(result, RunResult::empty());
        assert!(!result.is_executed());
    }

    #[test]
    fn test_pooled_zero_workers_rejected() {
        let err = Runner::new()
            .run(&BenchmarkConfig::pooled(5, 1024, 0))
            .unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[tokio::test]
    async fn test_sync_run_inside_current_thread_runtime() {
        let runner = Runner::new();
        let result = runner.run(&BenchmarkConfig::pooled(5, 1024, 2)).unwrap();
        assert_eq!(result.sink, GOLDEN_SINK);
        assert_eq!(result.executor, Some(ExecutionMode::Pooled));

        let err = runner.run(&BenchmarkConfig::pooled(5, 1024, 0)).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_sync_run_inside_multi_thread_runtime() {
        let result = Runner::new()
            .run(&BenchmarkConfig::pooled(5, 1024, 4))
            .unwrap();
        assert_eq!(result.sink, GOLDEN_SINK);
    }

    #[tokio::test]
    async fn test_run_async_matches_run() {
        let runner = Runner::new();
        let sequential = runner
            .run_async(&BenchmarkConfig::sequential(5, 1024))
            .await
            .unwrap();
        let pooled = runner
            .run_async(&BenchmarkConfig::pooled(5, 1024, 4))
            .await
            .unwrap();
        assert_eq!(sequential.sink, GOLDEN_SINK);
        assert_eq!(pooled.sink, GOLDEN_SINK);

        let skipped = runner
            .run_async(&BenchmarkConfig::new().with_mode(Mode::from("")))
            .await
            .unwrap();
        assert_eq!(skipped.sink, 0);
    }
}
