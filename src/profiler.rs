//! Profiling harness
//!
//! Wraps a benchmark run with process resource accounting and writes the
//! measured wall time, CPU time and peak memory to `profile.json`.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{BenchError, Result, PROFILE_FILE};

/// CPU time and memory usage of the current process
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub user_cpu_secs: f64,
    pub system_cpu_secs: f64,
    /// Peak resident set size in bytes, 0 where unavailable
    pub max_rss_bytes: u64,
}

impl ResourceUsage {
    /// Sample the resource usage of this process
    #[cfg(unix)]
    pub fn current() -> Result<Self> {
        // SAFETY: getrusage only writes into the zeroed struct we pass it.
        let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
        if rc != 0 {
            return Err(BenchError::Profiler(format!(
                "getrusage failed: {}",
                std::io::Error::last_os_error()
            )));
        }

        Ok(Self {
            user_cpu_secs: timeval_secs(usage.ru_utime),
            system_cpu_secs: timeval_secs(usage.ru_stime),
            max_rss_bytes: max_rss_bytes(usage.ru_maxrss),
        })
    }

    #[cfg(not(unix))]
    pub fn current() -> Result<Self> {
        Ok(Self::default())
    }
}

#[cfg(unix)]
fn timeval_secs(tv: libc::timeval) -> f64 {
    tv.tv_sec as f64 + tv.tv_usec as f64 / 1_000_000.0
}

// ru_maxrss is reported in bytes on macOS and in KiB elsewhere
#[cfg(all(unix, target_os = "macos"))]
fn max_rss_bytes(raw: libc::c_long) -> u64 {
    raw.max(0) as u64
}

#[cfg(all(unix, not(target_os = "macos")))]
fn max_rss_bytes(raw: libc::c_long) -> u64 {
    (raw.max(0) as u64).saturating_mul(1024)
}

/// Measurements written by [`Profiler::stop`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileReport {
    pub started_at: DateTime<Utc>,
    pub wall_secs: f64,
    /// CPU time consumed between start and stop
    pub user_cpu_secs: f64,
    pub system_cpu_secs: f64,
    pub max_rss_bytes: u64,
}

impl ProfileReport {
    /// Ratio of CPU time to wall time; above 1.0 means parallel execution
    pub fn cpu_utilization(&self) -> f64 {
        if self.wall_secs <= 0.0 {
            return 0.0;
        }
        (self.user_cpu_secs + self.system_cpu_secs) / self.wall_secs
    }
}

struct Session {
    started: Instant,
    started_at: DateTime<Utc>,
    usage: ResourceUsage,
}

/// Start/stop profiler writing into a directory
pub struct Profiler {
    output_dir: PathBuf,
    session: Option<Session>,
}

impl Profiler {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session: None,
        }
    }

    /// Path of the profile written on stop
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(PROFILE_FILE)
    }

    /// Begin profiling; fails if profiling is already running
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(BenchError::Profiler("profiling already started".to_string()));
        }

        fs::create_dir_all(&self.output_dir).map_err(|e| {
            BenchError::Profiler(format!(
                "Failed to create profile directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })?;

        self.session = Some(Session {
            started: Instant::now(),
            started_at: Utc::now(),
            usage: ResourceUsage::current()?,
        });
        debug!(path = %self.output_path().display(), "Profiling started");
        Ok(())
    }

    /// Stop profiling and write the profile.
    ///
    /// Returns `None` when profiling was not running.
    pub fn stop(&mut self) -> Result<Option<ProfileReport>> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        let wall = session.started.elapsed();
        let end = ResourceUsage::current()?;
        let report = ProfileReport {
            started_at: session.started_at,
            wall_secs: wall.as_secs_f64(),
            user_cpu_secs: (end.user_cpu_secs - session.usage.user_cpu_secs).max(0.0),
            system_cpu_secs: (end.system_cpu_secs - session.usage.system_cpu_secs).max(0.0),
            max_rss_bytes: end.max_rss_bytes,
        };

        let path = self.output_path();
        let content = serde_json::to_string_pretty(&report)
            .map_err(|e| BenchError::Profiler(format!("Failed to encode profile: {}", e)))?;
        fs::write(&path, content).map_err(|e| {
            BenchError::Profiler(format!("Failed to write {}: {}", path.display(), e))
        })?;

        info!(
            path = %path.display(),
            wall = %humantime::format_duration(Duration::from_millis(wall.as_millis() as u64)),
            "Profile written"
        );
        Ok(Some(report))
    }
}

impl Drop for Profiler {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.stop();
        }
    }
}
