//! Benchmark result data models
//!
//! Contains the value returned by a single run and the report built
//! around it for display and metrics.

use crate::bench::aggregate::Sink;
use crate::config::{BenchmarkConfig, ExecutionMode};
use crate::util::units::{calculate_tasks_per_second, calculate_throughput_mbps, format_throughput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of one `Runner::run` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// XOR of the leading byte of every task digest
    pub sink: u8,
    /// Strategy that produced the sink; `None` when nothing ran
    pub executor: Option<ExecutionMode>,
    /// Number of digests folded into the sink
    pub tasks_completed: u64,
}

/// Full report for one benchmark invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Timestamp when the benchmark was executed
    pub timestamp: DateTime<Utc>,
    /// Configuration used for this benchmark
    pub config: BenchmarkConfig,
    /// Value returned by the runner
    pub result: RunResult,
    /// Wall-clock time of the run
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,
    /// Completed tasks per second
    pub tasks_per_second: f64,
    /// Hashed bytes per second in MiB/s
    pub throughput_mbps: f64,
    /// System information at time of benchmark
    pub system_info: SystemInfo,
}

/// System information captured at benchmark time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Operating system name and architecture
    pub os: String,
    /// Logical CPUs available to the process
    pub cpu_count: usize,
}

impl RunResult {
    /// Result for a run that executed nothing (unrecognized mode)
    pub fn empty() -> Self {
        Self {
            sink: 0,
            executor: None,
            tasks_completed: 0,
        }
    }

    /// Result produced by an executor
    pub fn executed(executor: ExecutionMode, sink: Sink) -> Self {
        Self {
            sink: sink.value(),
            executor: Some(executor),
            tasks_completed: sink.absorbed(),
        }
    }

    /// Check whether an executor actually ran
    pub fn is_executed(&self) -> bool {
        self.executor.is_some()
    }
}

impl BenchmarkReport {
    /// Build a report for a finished run with detected system info
    pub fn new(config: BenchmarkConfig, result: RunResult, elapsed: Duration) -> Self {
        Self::with_system_info(config, result, elapsed, SystemInfo::detect())
    }

    /// Build a report with custom system info
    pub fn with_system_info(
        config: BenchmarkConfig,
        result: RunResult,
        elapsed: Duration,
        system_info: SystemInfo,
    ) -> Self {
        let bytes = result
            .tasks_completed
            .saturating_mul(config.block_size as u64);
        Self {
            timestamp: Utc::now(),
            tasks_per_second: calculate_tasks_per_second(result.tasks_completed, elapsed),
            throughput_mbps: calculate_throughput_mbps(bytes, elapsed),
            config,
            result,
            elapsed,
            system_info,
        }
    }

    /// Get a human-readable summary of the report
    pub fn summary(&self) -> String {
        format!(
            "{} - mode={} tasks={} block={} workers={} - done in {} (sink={}) - {:.1} tasks/s - {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            self.config.mode,
            self.config.task_count,
            crate::util::units::format_bytes(self.config.block_size as u64),
            self.config.effective_workers(),
            humantime::format_duration(self.elapsed),
            self.result.sink,
            self.tasks_per_second,
            format_throughput(self.throughput_mbps)
        )
    }
}

impl Default for SystemInfo {
    fn default() -> Self {
        Self {
            os: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            cpu_count: crate::config::default_worker_count(),
        }
    }
}

impl SystemInfo {
    /// Create system info by detecting current system
    pub fn detect() -> Self {
        Self::default()
    }
}

// Durations are stored as nanoseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_nanos() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let nanos = u64::deserialize(deserializer)?;
        Ok(Duration::from_nanos(nanos))
    }
}
