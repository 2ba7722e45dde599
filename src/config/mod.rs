//! Configuration management module
//!
//! Handles the benchmark configuration, the execution mode selector, and
//! layering of defaults, the optional TOML config file and command-line
//! overrides.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BenchError, Result, APP_NAME, CONFIG_FILE};

/// Default number of tasks per run
pub const DEFAULT_TASK_COUNT: u64 = 200;
/// Default block size in KiB
pub const DEFAULT_BLOCK_KB: usize = 1024;

/// Benchmark configuration, immutable for the duration of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Number of units of work
    pub task_count: u64,
    /// Size of the synthetic input per task (in bytes)
    pub block_size: usize,
    /// Execution strategy selector
    pub mode: Mode,
    /// Number of concurrent workers, used by pooled mode only
    pub worker_count: usize,
}

/// Closed set of execution strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// All tasks on one thread in id order
    Sequential,
    /// Tasks spread over a bounded worker pool
    Pooled,
}

/// Mode selector as supplied by the caller
///
/// Unknown selector strings are kept rather than rejected at parse time so
/// that validation can report them; the runner treats them as a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Mode {
    Sequential,
    Pooled,
    Unrecognized(String),
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            task_count: DEFAULT_TASK_COUNT,
            block_size: DEFAULT_BLOCK_KB * 1024,
            mode: Mode::Sequential,
            worker_count: default_worker_count(),
        }
    }
}

impl BenchmarkConfig {
    /// Create a new benchmark configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a sequential run
    pub fn sequential(task_count: u64, block_size: usize) -> Self {
        Self {
            task_count,
            block_size,
            mode: Mode::Sequential,
            ..Self::default()
        }
    }

    /// Configuration for a pooled run
    pub fn pooled(task_count: u64, block_size: usize, worker_count: usize) -> Self {
        Self {
            task_count,
            block_size,
            mode: Mode::Pooled,
            worker_count,
        }
    }

    /// Set the mode selector
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Clamp values the loader is responsible for correcting.
    ///
    /// A worker count below one becomes one.
    pub fn normalized(mut self) -> Self {
        if self.worker_count < 1 {
            self.worker_count = 1;
        }
        self
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(BenchError::Config(
                "Block size must be greater than 0".to_string(),
            ));
        }

        match &self.mode {
            Mode::Unrecognized(raw) => Err(BenchError::UnknownMode(raw.clone())),
            Mode::Pooled if self.worker_count == 0 => Err(BenchError::Config(
                "Worker count must be greater than 0 for pooled mode".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Worker count that actually applies to this configuration
    pub fn effective_workers(&self) -> usize {
        match self.mode {
            Mode::Pooled => self.worker_count,
            _ => 1,
        }
    }

    /// Get the standard configuration file path
    /// Uses $CONFIG_HOME/cpubench/cpubench.toml
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            BenchError::Config("Unable to determine config directory".to_string())
        })?;

        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Build a configuration from defaults overlaid with each layer in turn,
    /// later layers winning, then normalize it.
    pub fn from_layers<'a, I>(layers: I) -> Self
    where
        I: IntoIterator<Item = &'a FileConfig>,
    {
        layers
            .into_iter()
            .fold(Self::default(), |config, layer| layer.apply(config))
            .normalized()
    }
}

/// Partial configuration as read from a TOML file; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub tasks: Option<u64>,
    pub block_kb: Option<usize>,
    pub block_size: Option<usize>,
    pub mode: Option<String>,
    pub workers: Option<usize>,
}

impl FileConfig {
    /// Load a config file from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            BenchError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            BenchError::Config(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load the config file from the standard location.
    /// Returns an empty configuration if the file doesn't exist.
    pub fn load_default() -> Result<Self> {
        let path = BenchmarkConfig::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        debug!(path = %path.display(), "Loading config file");
        Self::load_from(&path)
    }

    /// Overlay these values onto a base configuration.
    /// `block_size` in bytes wins over `block_kb`.
    pub fn apply(&self, mut base: BenchmarkConfig) -> BenchmarkConfig {
        if let Some(tasks) = self.tasks {
            base.task_count = tasks;
        }
        if let Some(kb) = self.block_kb {
            base.block_size = kb.saturating_mul(1024);
        }
        if let Some(bytes) = self.block_size {
            base.block_size = bytes;
        }
        if let Some(mode) = &self.mode {
            base.mode = Mode::from(mode.as_str());
        }
        if let Some(workers) = self.workers {
            base.worker_count = workers;
        }
        base
    }
}

impl Mode {
    /// The execution strategy this selector names, if any
    pub fn execution_mode(&self) -> Option<ExecutionMode> {
        match self {
            Mode::Sequential => Some(ExecutionMode::Sequential),
            Mode::Pooled => Some(ExecutionMode::Pooled),
            Mode::Unrecognized(_) => None,
        }
    }

    /// Check if the selector names a known strategy
    pub fn is_recognized(&self) -> bool {
        self.execution_mode().is_some()
    }
}

impl From<&str> for Mode {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "single" | "sequential" => Mode::Sequential,
            "pool" | "pooled" => Mode::Pooled,
            _ => Mode::Unrecognized(raw.to_string()),
        }
    }
}

impl From<String> for Mode {
    fn from(raw: String) -> Self {
        Mode::from(raw.as_str())
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

impl From<ExecutionMode> for Mode {
    fn from(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Sequential => Mode::Sequential,
            ExecutionMode::Pooled => Mode::Pooled,
        }
    }
}

impl FromStr for Mode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Mode::from(s))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sequential => f.write_str("single"),
            Mode::Pooled => f.write_str("pool"),
            Mode::Unrecognized(raw) => f.write_str(raw),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Mode::from(*self), f)
    }
}

/// Worker count used when none is configured: one per available CPU
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mode_parsing() {
        assert_eq!(Mode::from("single"), Mode::Sequential);
        assert_eq!(Mode::from("Sequential"), Mode::Sequential);
        assert_eq!(Mode::from(" pool "), Mode::Pooled);
        assert_eq!(Mode::from("POOLED"), Mode::Pooled);
        assert_eq!(Mode::from("turbo"), Mode::Unrecognized("turbo".to_string()));
        assert_eq!("pool".parse::<Mode>().unwrap(), Mode::Pooled);
    }

    #[test]
    fn test_mode_display_uses_cli_names() {
        assert_eq!(Mode::Sequential.to_string(), "single");
        assert_eq!(Mode::Pooled.to_string(), "pool");
        assert_eq!(Mode::Unrecognized("x".into()).to_string(), "x");
        assert_eq!(ExecutionMode::Pooled.to_string(), "pool");
    }

    #[test]
    fn test_execution_mode() {
        assert_eq!(Mode::Sequential.execution_mode(), Some(ExecutionMode::Sequential));
        assert_eq!(Mode::Pooled.execution_mode(), Some(ExecutionMode::Pooled));
        assert!(!Mode::Unrecognized("x".into()).is_recognized());
    }

    #[test]
    fn test_validate() {
        assert!(BenchmarkConfig::sequential(5, 1024).validate().is_ok());
        assert!(BenchmarkConfig::pooled(5, 1024, 4).validate().is_ok());

        let err = BenchmarkConfig::sequential(5, 0).validate().unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));

        let err = BenchmarkConfig::pooled(5, 1024, 0).validate().unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));

        let err = BenchmarkConfig::default()
            .with_mode(Mode::from("bogus"))
            .validate()
            .unwrap_err();
        assert!(matches!(err, BenchError::UnknownMode(ref m) if m == "bogus"));
    }

    #[test]
    fn test_zero_tasks_is_valid() {
        assert!(BenchmarkConfig::sequential(0, 1).validate().is_ok());
    }

    #[test]
    fn test_normalized_clamps_workers() {
        let config = BenchmarkConfig::pooled(5, 1024, 0).normalized();
        assert_eq!(config.worker_count, 1);
        let config = BenchmarkConfig::pooled(5, 1024, 6).normalized();
        assert_eq!(config.worker_count, 6);
    }

    #[test]
    fn test_effective_workers() {
        assert_eq!(BenchmarkConfig::pooled(1, 1, 8).effective_workers(), 8);
        let mut config = BenchmarkConfig::sequential(1, 1);
        config.worker_count = 8;
        assert_eq!(config.effective_workers(), 1);
    }

    #[test]
    fn test_defaults() {
        let config = BenchmarkConfig::default();
        assert_eq!(config.task_count, 200);
        assert_eq!(config.block_size, 1024 * 1024);
        assert_eq!(config.mode, Mode::Sequential);
        assert!(config.worker_count >= 1);
    }

    #[test]
    fn test_toml_serialization() {
        let config = BenchmarkConfig::pooled(10, 4096, 3);
        let toml_str = toml::to_string(&config).expect("Failed to serialize to TOML");
        assert!(toml_str.contains("mode = \"pool\""));
        let deserialized: BenchmarkConfig =
            toml::from_str(&toml_str).expect("Failed to deserialize from TOML");
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_serde_keeps_unrecognized_mode() {
        let config = BenchmarkConfig::default().with_mode(Mode::from("warp"));
        let json = serde_json::to_string(&config).unwrap();
        let back: BenchmarkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mode, Mode::Unrecognized("warp".to_string()));
    }

    #[test]
    fn test_file_config_apply() {
        let file = FileConfig {
            tasks: Some(7),
            block_kb: Some(2),
            block_size: None,
            mode: Some("pool".to_string()),
            workers: Some(3),
        };
        let config = file.apply(BenchmarkConfig::default());
        assert_eq!(config, BenchmarkConfig::pooled(7, 2048, 3));
    }

    #[test]
    fn test_file_config_block_size_wins() {
        let file = FileConfig {
            block_kb: Some(2),
            block_size: Some(100),
            ..FileConfig::default()
        };
        assert_eq!(file.apply(BenchmarkConfig::default()).block_size, 100);
    }

    #[test]
    fn test_file_config_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "tasks = 42\nmode = \"single\"\nblock_kb = 4\n").unwrap();

        let file = FileConfig::load_from(&path).unwrap();
        assert_eq!(file.tasks, Some(42));
        assert_eq!(file.mode.as_deref(), Some("single"));
        assert_eq!(file.block_kb, Some(4));
        assert_eq!(file.workers, None);
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        fs::write(&path, "tasks = 3\nthreads = 9\n").unwrap();
        let err = FileConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, BenchError::Config(_)));
    }

    #[test]
    fn test_missing_config_file() {
        let err = FileConfig::load_from(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_file_path() {
        if let Ok(path) = BenchmarkConfig::config_file_path() {
            assert!(path.to_string_lossy().contains("cpubench"));
            assert!(path.to_string_lossy().ends_with("cpubench.toml"));
        }
    }

    #[test]
    fn test_from_layers_later_wins() {
        let file = FileConfig {
            tasks: Some(50),
            block_size: Some(4096),
            mode: Some("pool".to_string()),
            workers: Some(3),
            ..FileConfig::default()
        };
        let flags = FileConfig {
            block_kb: Some(2),
            workers: Some(0),
            ..FileConfig::default()
        };

        let config = BenchmarkConfig::from_layers([&file, &flags]);
        assert_eq!(config.task_count, 50);
        assert_eq!(config.block_size, 2048);
        assert_eq!(config.mode, Mode::Pooled);
        assert_eq!(config.worker_count, 1);
    }

    #[test]
    fn test_from_layers_empty_is_default() {
        let config = BenchmarkConfig::from_layers(std::iter::empty());
        assert_eq!(config, BenchmarkConfig::default().normalized());
    }
}
