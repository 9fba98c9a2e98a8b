//! Core engine — the reconciliation driver and its two schedulers.
//!
//! [`driver::ReconciliationDriver`] runs exactly one cycle per call.
//! [`runner::run_loop`] drives it on a fixed interval until cancelled;
//! [`service::GridService`] wraps it with start/stop/status, a manual
//! tick, and a summary feed.

pub mod driver;
pub mod runner;
pub mod service;

use std::time::Duration;

use tracing::warn;

/// Shortest interval either scheduler will run at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1_000);

/// Raise a requested interval to [`MIN_INTERVAL`] if needed.
pub fn effective_interval(requested: Duration) -> Duration {
    if requested < MIN_INTERVAL {
        warn!(
            requested_ms = requested.as_millis() as u64,
            floor_ms = MIN_INTERVAL.as_millis() as u64,
            "Interval below floor, clamping"
        );
        MIN_INTERVAL
    } else {
        requested
    }
}
