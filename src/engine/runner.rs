//! Free-running scheduler.
//!
//! Drives a [`ReconciliationDriver`] on a fixed interval until the
//! cancellation token fires. Cycles run back to back on one task, so there
//! is never more than one in flight.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::driver::ReconciliationDriver;
use super::effective_interval;
use crate::types::CycleSummary;

/// Run cycles until `shutdown` is cancelled, handing each summary to
/// `on_cycle`. Returns the number of cycles run.
///
/// The first cycle runs immediately. Cancellation is only observed between
/// cycles, so a cycle that has started always completes.
pub async fn run_loop<F>(
    driver: &mut ReconciliationDriver,
    interval: Duration,
    shutdown: CancellationToken,
    mut on_cycle: F,
) -> u64
where
    F: FnMut(&CycleSummary),
{
    let interval = effective_interval(interval);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        interval_ms = interval.as_millis() as u64,
        strategy = %driver.strategy(),
        "Entering grid loop"
    );

    let mut cycles = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(cycles, "Grid loop stopped");
                break;
            }
            _ = ticker.tick() => {
                let summary = driver.run_cycle().await;
                cycles += 1;
                on_cycle(&summary);
            }
        }
    }

    cycles
}
