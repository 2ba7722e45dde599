//! Units formatting and conversion utilities
//!
//! Provides functions for human-readable sizes and for the rate metrics
//! reported after a run.

use byte_unit::{Byte, UnitType};
use std::time::Duration;

/// Format bytes into human-readable size with binary units
///
/// # Examples
/// ```
/// use cpubench::util::units::format_bytes;
///
/// assert_eq!(format_bytes(1024), "1.0 KiB");
/// assert_eq!(format_bytes(1048576), "1.0 MiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.1}", adjusted)
}

/// Parse human-readable size string into bytes
///
/// Accepts plain byte counts and decimal or binary units (`KB`, `KiB`, ...).
///
/// # Examples
/// ```
/// use cpubench::util::units::parse_bytes;
///
/// assert_eq!(parse_bytes("1 KiB").unwrap(), 1024);
/// assert_eq!(parse_bytes("64KiB").unwrap(), 65536);
/// ```
pub fn parse_bytes(input: &str) -> Result<u64, String> {
    Byte::parse_str(input, true)
        .map(|byte| byte.as_u64())
        .map_err(|e| format!("Invalid size '{}': {}", input.trim(), e))
}

/// Calculate throughput in MiB/s from bytes and duration
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use cpubench::util::units::calculate_throughput_mbps;
///
/// let throughput = calculate_throughput_mbps(1048576, Duration::from_secs(1));
/// assert!((throughput - 1.0).abs() < 0.01);
/// ```
pub fn calculate_throughput_mbps(bytes: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    let megabytes = bytes as f64 / 1_048_576.0;
    megabytes / duration.as_secs_f64()
}

/// Calculate completed tasks per second
pub fn calculate_tasks_per_second(tasks: u64, duration: Duration) -> f64 {
    if duration.is_zero() {
        return 0.0;
    }

    tasks as f64 / duration.as_secs_f64()
}

/// Format throughput value with appropriate units
///
/// # Examples
/// ```
/// use cpubench::util::units::format_throughput;
///
/// assert_eq!(format_throughput(1024.0), "1.0 GiB/s");
/// assert_eq!(format_throughput(1.5), "1.5 MiB/s");
/// ```
pub fn format_throughput(mbps: f64) -> String {
    if mbps >= 1024.0 {
        format!("{:.1} GiB/s", mbps / 1024.0)
    } else if mbps >= 1.0 {
        format!("{:.1} MiB/s", mbps)
    } else if mbps >= 0.001 {
        format!("{:.1} KiB/s", mbps * 1024.0)
    } else {
        format!("{:.3} MiB/s", mbps)
    }
}
