//! Prometheus metrics exporter.
//!
//! Holds the parameters and timing of the most recent run and renders them
//! in Prometheus text exposition format. The exporter is fed after a run
//! returns and has no influence on the engine.

use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tracing::info;

use crate::models::result::BenchmarkReport;
use crate::{BenchError, Result, COMMIT, VERSION};

/// Parameters and outcome of one finished run, as exported
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub task_count: u64,
    pub tasks_completed: u64,
    pub mode: String,
    pub worker_count: usize,
    pub block_size: usize,
    pub elapsed: Duration,
    pub sink: u8,
    pub finished_at: DateTime<Utc>,
}

impl From<&BenchmarkReport> for RunRecord {
    fn from(report: &BenchmarkReport) -> Self {
        Self {
            task_count: report.config.task_count,
            tasks_completed: report.result.tasks_completed,
            mode: report.config.mode.to_string(),
            worker_count: report.config.effective_workers(),
            block_size: report.config.block_size,
            elapsed: report.elapsed,
            sink: report.result.sink,
            finished_at: report.timestamp,
        }
    }
}

/// Shared metrics state served by the exporter
#[derive(Debug)]
pub struct MetricsRegistry {
    started: Instant,
    started_at: DateTime<Utc>,
    runs: AtomicU64,
    last_run: RwLock<Option<RunRecord>>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            runs: AtomicU64::new(0),
            last_run: RwLock::new(None),
        }
    }

    /// Record a finished run; the previous run is replaced
    pub async fn record_run(&self, record: RunRecord) {
        self.runs.fetch_add(1, Ordering::Relaxed);
        *self.last_run.write().await = Some(record);
    }

    /// Record a finished run from its report
    pub async fn record_report(&self, report: &BenchmarkReport) {
        self.record_run(RunRecord::from(report)).await;
    }

    /// Number of runs recorded so far
    pub fn total_runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Time since the registry was created
    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Format all metrics as Prometheus text.
    pub async fn render(&self) -> String {
        let mut output = String::new();
        let last = self.last_run.read().await.clone();

        gauge(&mut output, "cpubench_info", "Application information");
        writeln!(
            output,
            "cpubench_info{{version=\"{VERSION}\",commit=\"{COMMIT}\"}} 1"
        )
        .ok();

        gauge(&mut output, "cpubench_uptime_seconds", "Application uptime in seconds");
        writeln!(
            output,
            "cpubench_uptime_seconds {:.2}",
            self.uptime().as_secs_f64()
        )
        .ok();

        let record = last.clone().unwrap_or_else(|| RunRecord {
            task_count: 0,
            tasks_completed: 0,
            mode: String::new(),
            worker_count: 0,
            block_size: 0,
            elapsed: Duration::ZERO,
            sink: 0,
            finished_at: self.started_at,
        });

        gauge(&mut output, "cpubench_tasks_total", "Number of tasks configured for the last run");
        writeln!(output, "cpubench_tasks_total {}", record.task_count).ok();

        gauge(&mut output, "cpubench_tasks_completed", "Number of tasks completed by the last run");
        writeln!(output, "cpubench_tasks_completed {}", record.tasks_completed).ok();

        gauge(&mut output, "cpubench_execution_time_seconds", "Wall time of the last run in seconds");
        writeln!(
            output,
            "cpubench_execution_time_seconds {:.6}",
            record.elapsed.as_secs_f64()
        )
        .ok();

        gauge(&mut output, "cpubench_mode_info", "Execution mode of the last run");
        writeln!(output, "cpubench_mode_info{{mode=\"{}\"}} 1", escape_label(&record.mode)).ok();

        gauge(&mut output, "cpubench_workers", "Number of workers used by the last run");
        writeln!(output, "cpubench_workers {}", record.worker_count).ok();

        gauge(&mut output, "cpubench_block_size_bytes", "Block size of the last run in bytes");
        writeln!(output, "cpubench_block_size_bytes {}", record.block_size).ok();

        gauge(&mut output, "cpubench_sink", "Sink value produced by the last run");
        writeln!(output, "cpubench_sink {}", record.sink).ok();

        writeln!(output, "# HELP cpubench_runs_total Total number of benchmark runs").ok();
        writeln!(output, "# TYPE cpubench_runs_total counter").ok();
        writeln!(output, "cpubench_runs_total {}", self.total_runs()).ok();

        if let Some(last) = last {
            gauge(
                &mut output,
                "cpubench_last_run_timestamp_seconds",
                "Unix timestamp of the last run",
            );
            writeln!(
                output,
                "cpubench_last_run_timestamp_seconds {}",
                last.finished_at.timestamp()
            )
            .ok();
        }

        output
    }
}

fn gauge(output: &mut String, name: &str, help: &str) {
    writeln!(output, "# HELP {name} {help}").ok();
    writeln!(output, "# TYPE {name} gauge").ok();
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Create the HTTP router serving `/metrics`, `/health` and an index page.
pub fn create_router(registry: Arc<MetricsRegistry>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .route("/health", get(health_check))
        .with_state(registry)
}

async fn metrics(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    let body = registry.render().await;
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn index(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>cpubench metrics</title></head>\n<body>\n\
         <h1>cpubench</h1>\n<p>Metrics endpoint: <a href=\"/metrics\">/metrics</a></p>\n\
         <p>Version: {}</p>\n<p>Started: {}</p>\n</body>\n</html>\n",
        VERSION,
        registry.started_at.to_rfc3339()
    ))
}

/// Bind the metrics listener
pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| BenchError::Metrics(format!("Failed to bind {}: {}", addr, e)))
}

/// Serve metrics on an already bound listener until the server fails
pub async fn serve(listener: TcpListener, registry: Arc<MetricsRegistry>) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Metrics server listening");
    }
    axum::serve(listener, create_router(registry))
        .await
        .map_err(|e| BenchError::Metrics(e.to_string()))
}
