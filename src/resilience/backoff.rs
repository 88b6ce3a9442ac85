//! Exponential backoff.

use std::time::Duration;

/// Delay before the retry that follows attempt `attempt` (0-indexed):
/// `factor × 2^attempt` seconds.
///
/// Saturates at `Duration::MAX` instead of overflowing.
pub fn calculate_backoff(attempt: u32, factor: f64) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = factor * 2f64.powi(exponent);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
