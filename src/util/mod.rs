//! Utility functions module
//!
//! Contains helpers for size formatting and rate calculations.

pub mod units;

// Re-export commonly used functions
pub use units::{
    calculate_tasks_per_second, calculate_throughput_mbps, format_bytes, format_throughput,
    parse_bytes,
};
