use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use cpubench::bench::Runner;
use cpubench::config::{BenchmarkConfig, FileConfig};
use cpubench::error::{exit_code, user_friendly_message};
use cpubench::metrics::{self, MetricsRegistry};
use cpubench::models::BenchmarkReport;
use cpubench::profiler::Profiler;
use cpubench::util::{format_bytes, parse_bytes};
use cpubench::{Result, COMMIT, VERSION};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cpubench", about = "CPU benchmark comparing sequential and worker pool execution")]
#[command(disable_version_flag = true)]
struct Cli {
    /// Number of tasks to run
    #[arg(long, env = "CPUBENCH_TASKS")]
    tasks: Option<u64>,

    /// Block size in KiB
    #[arg(long = "block-kb", env = "CPUBENCH_BLOCK_KB")]
    block_kb: Option<usize>,

    /// Block size with units (e.g. 64KiB); wins over --block-kb
    #[arg(long = "block-size", env = "CPUBENCH_BLOCK_SIZE", value_parser = parse_block_size)]
    block_size: Option<usize>,

    /// Execution mode: single or pool
    #[arg(long, env = "CPUBENCH_MODE")]
    mode: Option<String>,

    /// Number of workers for pool mode
    #[arg(long, env = "CPUBENCH_WORKERS")]
    workers: Option<usize>,

    /// Config file (defaults to the user config directory)
    #[arg(long, env = "CPUBENCH_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print only the sink value
    #[arg(short, long)]
    quiet: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Serve Prometheus metrics on this port and keep running after the benchmark
    #[arg(long, env = "CPUBENCH_METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Write a resource profile of the run
    #[arg(long)]
    profile: bool,

    /// Directory for profile.json
    #[arg(long, default_value = ".")]
    profile_dir: PathBuf,

    /// Print version information and exit
    #[arg(short = 'V', long)]
    version: bool,
}

fn parse_block_size(input: &str) -> std::result::Result<usize, String> {
    let bytes = parse_bytes(input)?;
    usize::try_from(bytes).map_err(|_| format!("Block size '{}' is too large", input))
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.version {
        println!("cpubench {} (commit {})", VERSION, COMMIT);
        return;
    }

    init_tracing(&cli);

    if let Err(e) = run(cli).await {
        error!(error = %e, "cpubench failed");
        eprintln!("Error: {}", user_friendly_message(&e));
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(&cli)?;
    config.validate()?;

    let registry = Arc::new(MetricsRegistry::new());
    let server = match cli.metrics_port {
        Some(port) => {
            let listener = metrics::bind(([0, 0, 0, 0], port).into()).await?;
            Some(tokio::spawn(metrics::serve(listener, Arc::clone(&registry))))
        }
        None => None,
    };

    let mut profiler = cli.profile.then(|| Profiler::new(&cli.profile_dir));
    if let Some(profiler) = profiler.as_mut() {
        profiler.start()?;
    }

    let spinner = (!cli.quiet && !cli.json).then(|| start_spinner(&config));

    let start = Instant::now();
    let outcome = Runner::new().run_async(&config).await;
    let elapsed = start.elapsed();

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    if let Some(profiler) = profiler.as_mut() {
        if let Some(profile) = profiler.stop()? {
            info!(
                path = %profiler.output_path().display(),
                cpu_utilization = profile.cpu_utilization(),
                "Profile saved"
            );
        }
    }

    let report = BenchmarkReport::new(config, outcome?, elapsed);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if cli.quiet {
        println!("{}", report.result.sink);
    } else {
        println!("{}", report.summary());
    }

    registry.record_report(&report).await;

    if let (Some(server), Some(port)) = (server, cli.metrics_port) {
        eprintln!("Metrics available at: http://localhost:{}/metrics", port);
        eprintln!("Press Ctrl+C to stop");
        tokio::select! {
            result = server => {
                match result {
                    Ok(served) => served?,
                    Err(e) => warn!(error = %e, "Metrics server task failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down metrics server");
            }
        }
    }

    Ok(())
}

/// Defaults, then the config file, then environment and flags
fn resolve_config(cli: &Cli) -> Result<BenchmarkConfig> {
    let file = match &cli.config {
        Some(path) => FileConfig::load_from(path)?,
        None => FileConfig::load_default()?,
    };
    let overrides = FileConfig {
        tasks: cli.tasks,
        block_kb: cli.block_kb,
        block_size: cli.block_size,
        mode: cli.mode.clone(),
        workers: cli.workers,
    };

    Ok(BenchmarkConfig::from_layers([&file, &overrides]))
}

fn start_spinner(config: &BenchmarkConfig) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!(
        "mode={} tasks={} block={} workers={}",
        config.mode,
        config.task_count,
        format_bytes(config.block_size as u64),
        config.effective_workers()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}
