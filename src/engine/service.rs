//! Supervised grid service — start/stop/status around one driver.
//!
//! One `GridService` manages one (account, instrument) pair. It owns at
//! most one running driver; the driver's mutex doubles as the in-flight
//! guard, so a timer tick or manual tick that finds a cycle already running
//! is skipped rather than queued.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::driver::ReconciliationDriver;
use super::effective_interval;
use crate::gateway::ExchangeGateway;
use crate::types::{CyclePhase, CycleSummary, GridConfig, GridError, Strategy};

/// Summaries kept for `recent_cycles`.
const CYCLE_LOG_LIMIT: usize = 100;

/// Buffered summaries per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Public results
// ---------------------------------------------------------------------------

/// Result of a manual or timer tick.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Completed(CycleSummary),
    /// Another cycle was still in flight.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// Already running with the same grid and strategy; nothing changed.
    AlreadyRunning,
}

/// Snapshot of the service for callers and the control API.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub running: bool,
    pub account: String,
    pub instrument: String,
    pub strategy: Option<Strategy>,
    pub phase: Option<CyclePhase>,
    pub interval_ms: Option<u64>,
    pub grid: Option<GridConfig>,
    pub cycles_run: u64,
    pub last_error: Option<String>,
    pub last_cycle_summary: Option<CycleSummary>,
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct ActiveRun {
    grid: GridConfig,
    strategy: Strategy,
    interval: Duration,
    driver: Arc<Mutex<ReconciliationDriver>>,
    shutdown: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct ServiceRecord {
    phase: Option<CyclePhase>,
    cycles_run: u64,
    last_error: Option<String>,
    last_summary: Option<CycleSummary>,
    recent: VecDeque<CycleSummary>,
}

struct ServiceInner {
    gateway: Arc<dyn ExchangeGateway>,
    account: String,
    instrument: String,
    run: Mutex<Option<ActiveRun>>,
    record: RwLock<ServiceRecord>,
    events: broadcast::Sender<CycleSummary>,
}

// ---------------------------------------------------------------------------
// GridService
// ---------------------------------------------------------------------------

/// Handle to a grid engine instance. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct GridService {
    inner: Arc<ServiceInner>,
}

impl GridService {
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        account: impl Into<String>,
        instrument: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ServiceInner {
                gateway,
                account: account.into(),
                instrument: instrument.into(),
                run: Mutex::new(None),
                record: RwLock::new(ServiceRecord::default()),
                events,
            }),
        }
    }

    /// Validate the grid against the exchange and begin the timer loop.
    ///
    /// Calling again with the same grid and strategy while running is a
    /// no-op; a different grid or strategy is refused until `stop()`.
    pub async fn start(
        &self,
        grid: GridConfig,
        strategy: Strategy,
        interval: Duration,
    ) -> Result<StartOutcome, GridError> {
        if let Some(outcome) = existing_run(&*self.inner.run.lock().await, &grid, strategy) {
            return outcome;
        }

        // Gateway reads happen outside the slot lock.
        let driver = ReconciliationDriver::new(
            self.inner.gateway.clone(),
            self.inner.account.clone(),
            self.inner.instrument.clone(),
            grid.clone(),
            strategy,
        )?;
        let geometry = driver.check_geometry().await?;
        let interval = effective_interval(interval);

        let mut slot = self.inner.run.lock().await;
        if let Some(outcome) = existing_run(&slot, &grid, strategy) {
            return outcome;
        }

        {
            let mut record = self.inner.record.write().await;
            record.phase = Some(driver.phase());
            record.cycles_run = 0;
            record.last_error = None;
            record.last_summary = None;
        }

        let driver = Arc::new(Mutex::new(driver));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(self.clone().timer_loop(driver.clone(), interval, shutdown.clone()));

        info!(
            account = %self.inner.account,
            instrument = %self.inner.instrument,
            strategy = %strategy,
            levels = geometry.levels().len(),
            order_size = %geometry.order_size(),
            interval_ms = interval.as_millis() as u64,
            "Grid engine started"
        );

        *slot = Some(ActiveRun {
            grid,
            strategy,
            interval,
            driver,
            shutdown,
            handle,
        });
        Ok(StartOutcome::Started)
    }

    /// Stop scheduling. A cycle already in flight finishes first; the
    /// engine state is then discarded. Returns whether anything was running.
    ///
    /// The slot stays locked until the last cycle is done, so a concurrent
    /// `start()` or `tick()` cannot overlap it.
    pub async fn stop(&self) -> bool {
        let mut slot = self.inner.run.lock().await;
        let Some(run) = slot.as_mut() else {
            return false;
        };

        run.shutdown.cancel();
        if let Err(e) = (&mut run.handle).await {
            warn!(error = %e, "Grid timer task ended abnormally");
        }
        // A manual tick may still hold the driver.
        let cycles = run.driver.lock().await.cycle_count();
        *slot = None;
        info!(cycles, "Grid engine stopped");

        self.inner.record.write().await.phase = None;
        true
    }

    /// Run one cycle now, subject to the in-flight guard.
    pub async fn tick(&self) -> Result<TickOutcome, GridError> {
        let guard = {
            let slot = self.inner.run.lock().await;
            let run = slot.as_ref().ok_or(GridError::NotRunning)?;
            // Taken under the slot lock so `stop()` waits for this cycle.
            match run.driver.clone().try_lock_owned() {
                Ok(guard) => guard,
                Err(_) => return Ok(TickOutcome::Skipped),
            }
        };
        Ok(TickOutcome::Completed(self.run_locked(guard).await))
    }

    pub async fn status(&self) -> EngineStatus {
        let (running, strategy, interval_ms, grid) = match self.inner.run.lock().await.as_ref() {
            Some(run) => (
                !run.handle.is_finished(),
                Some(run.strategy),
                Some(run.interval.as_millis() as u64),
                Some(run.grid.clone()),
            ),
            None => (false, None, None, None),
        };
        let record = self.inner.record.read().await;

        EngineStatus {
            running,
            account: self.inner.account.clone(),
            instrument: self.inner.instrument.clone(),
            strategy,
            phase: record.phase,
            interval_ms,
            grid,
            cycles_run: record.cycles_run,
            last_error: record.last_error.clone(),
            last_cycle_summary: record.last_summary.clone(),
        }
    }

    /// Live feed of cycle summaries, one message per completed cycle.
    pub fn subscribe(&self) -> broadcast::Receiver<CycleSummary> {
        self.inner.events.subscribe()
    }

    /// The most recent summaries, oldest first.
    pub async fn recent_cycles(&self) -> Vec<CycleSummary> {
        self.inner.record.read().await.recent.iter().cloned().collect()
    }

    async fn timer_loop(
        self,
        driver: Arc<Mutex<ReconciliationDriver>>,
        interval: Duration,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let TickOutcome::Skipped = self.run_guarded(&driver).await {
                        debug!("Timer tick skipped, cycle in flight");
                    }
                }
            }
        }
    }

    async fn run_guarded(&self, driver: &Arc<Mutex<ReconciliationDriver>>) -> TickOutcome {
        match driver.clone().try_lock_owned() {
            Ok(guard) => TickOutcome::Completed(self.run_locked(guard).await),
            Err(_) => TickOutcome::Skipped,
        }
    }

    async fn run_locked(&self, mut guard: OwnedMutexGuard<ReconciliationDriver>) -> CycleSummary {
        let summary = guard.run_cycle().await;
        let phase = guard.phase();

        // Recorded while the guard is held so summaries publish in order.
        {
            let mut record = self.inner.record.write().await;
            record.phase = Some(phase);
            record.cycles_run += 1;
            record.last_error = summary.error.clone();
            record.last_summary = Some(summary.clone());
            record.recent.push_back(summary.clone());
            while record.recent.len() > CYCLE_LOG_LIMIT {
                record.recent.pop_front();
            }
        }
        // No subscribers is fine.
        let _ = self.inner.events.send(summary.clone());

        summary
    }
}

/// What `start()` should return given the current slot, if it must not
/// start a new run.
fn existing_run(
    slot: &Option<ActiveRun>,
    grid: &GridConfig,
    strategy: Strategy,
) -> Option<Result<StartOutcome, GridError>> {
    let run = slot.as_ref().filter(|run| !run.handle.is_finished())?;
    if run.grid == *grid && run.strategy == strategy {
        debug!("Start requested for the running configuration");
        Some(Ok(StartOutcome::AlreadyRunning))
    } else {
        Some(Err(GridError::AlreadyRunning))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
