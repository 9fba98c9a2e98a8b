//! Reconciliation driver — one read → plan → submit cycle.
//!
//! The driver exclusively owns [`ReconciliationState`]. Every cycle either
//! submits, no-ops, or fails; a failed cycle leaves the state exactly as it
//! was so the next cycle retries from the same previous snapshot.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info};

use crate::gateway::ExchangeGateway;
use crate::grid::numeric::{from_micros, to_micros};
use crate::grid::GridGeometry;
use crate::planner::{index_snapshot, plan_cycle, SnapshotMap};
use crate::types::{
    CycleOutcome, CyclePhase, CycleSummary, DesiredOrder, GridConfig, GridError, PlacementRequest,
    Strategy,
};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Everything the engine carries between cycles.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationState {
    /// Book as of the last successful cycle, before that cycle's batch.
    /// `None` until the first success, which makes the next cycle a seed.
    previous_snapshot: Option<SnapshotMap>,
    /// Source of client order ids.
    client_order_sequence: u64,
}

impl ReconciliationState {
    pub fn previous_snapshot(&self) -> Option<&SnapshotMap> {
        self.previous_snapshot.as_ref()
    }

    pub fn client_order_sequence(&self) -> u64 {
        self.client_order_sequence
    }

    fn next_client_order_id(&mut self) -> String {
        self.client_order_sequence += 1;
        format!("grid-{:06}", self.client_order_sequence)
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Runs reconciliation cycles for one (account, instrument) pair.
pub struct ReconciliationDriver {
    gateway: Arc<dyn ExchangeGateway>,
    account: String,
    instrument: String,
    grid: GridConfig,
    strategy: Strategy,
    state: ReconciliationState,
    cycle_count: u64,
}

impl ReconciliationDriver {
    /// Create a driver. Fails on a config that can never produce a ladder.
    pub fn new(
        gateway: Arc<dyn ExchangeGateway>,
        account: impl Into<String>,
        instrument: impl Into<String>,
        grid: GridConfig,
        strategy: Strategy,
    ) -> Result<Self, GridError> {
        grid.validate()?;
        Ok(Self {
            gateway,
            account: account.into(),
            instrument: instrument.into(),
            grid,
            strategy,
            state: ReconciliationState::default(),
            cycle_count: 0,
        })
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Phase the next cycle will run in.
    pub fn phase(&self) -> CyclePhase {
        if self.state.previous_snapshot.is_some() {
            CyclePhase::Steady
        } else {
            CyclePhase::Seeding
        }
    }

    /// Build the geometry against the exchange's current book params
    /// without touching any state.
    pub async fn check_geometry(&self) -> Result<GridGeometry, GridError> {
        let params = self
            .gateway
            .book_params(&self.instrument)
            .await
            .map_err(|e| GridError::GatewayRead(format!("book params: {e:#}")))?;
        GridGeometry::build(&self.grid, &params)
    }

    /// Run one cycle and report it. Never returns an error: failures are
    /// carried in the summary.
    pub async fn run_cycle(&mut self) -> CycleSummary {
        self.cycle_count += 1;
        let mut summary = CycleSummary {
            cycle_number: self.cycle_count,
            timestamp: Utc::now(),
            strategy: self.strategy,
            phase: None,
            mid_price: None,
            pivot_index: None,
            existing_count: 0,
            closed_count: 0,
            placed_count: 0,
            cancelled_count: 0,
            skipped_count: 0,
            outcome: CycleOutcome::Failed,
            error: None,
        };

        match self.reconcile(&mut summary).await {
            Ok(outcome) => {
                summary.outcome = outcome;
                info!(
                    cycle = summary.cycle_number,
                    strategy = %summary.strategy,
                    phase = ?summary.phase,
                    mid = ?summary.mid_price,
                    pivot = ?summary.pivot_index,
                    existing = summary.existing_count,
                    closed = summary.closed_count,
                    placed = summary.placed_count,
                    cancelled = summary.cancelled_count,
                    skipped = summary.skipped_count,
                    outcome = %summary.outcome,
                    "Cycle complete"
                );
            }
            Err(e) => {
                summary.outcome = CycleOutcome::Failed;
                summary.placed_count = 0;
                summary.cancelled_count = 0;
                summary.error = Some(e.to_string());
                error!(
                    cycle = summary.cycle_number,
                    strategy = %summary.strategy,
                    mid = ?summary.mid_price,
                    error = %e,
                    "Cycle failed, state kept for retry"
                );
            }
        }

        summary
    }

    async fn reconcile(&mut self, summary: &mut CycleSummary) -> Result<CycleOutcome, GridError> {
        // 1. Market state
        let mid = self
            .gateway
            .mid_price(&self.instrument)
            .await
            .map_err(|e| GridError::GatewayRead(format!("mid price: {e:#}")))?;
        summary.mid_price = Some(mid);
        let params = self
            .gateway
            .book_params(&self.instrument)
            .await
            .map_err(|e| GridError::GatewayRead(format!("book params: {e:#}")))?;

        // 2. Geometry from the latest params
        let geometry = GridGeometry::build(&self.grid, &params)?;

        // 3. Snapshot
        let current = self
            .gateway
            .open_orders(&self.account, &self.instrument)
            .await
            .map_err(|e| GridError::GatewayRead(format!("open orders: {e:#}")))?;
        summary.existing_count = current.len();

        // 4. Plan
        let mid_micro = to_micros(mid)?;
        let planned = plan_cycle(
            self.strategy,
            &geometry,
            mid_micro,
            self.state.previous_snapshot.as_ref(),
            &current,
        );
        summary.phase = Some(planned.phase);
        summary.pivot_index = planned.pivot;
        summary.closed_count = planned.plan.closed;
        summary.skipped_count = planned.plan.skipped;
        let plan = planned.plan;

        // 5. Nothing to do
        if plan.is_empty() {
            debug!(cycle = summary.cycle_number, "No-op cycle");
            self.state.previous_snapshot = Some(index_snapshot(&current));
            return Ok(CycleOutcome::NoOp);
        }

        // 6. Batch: cancellations, then placements
        let placements = self.size_placements(&geometry, &plan.placements);

        // 7. Submit
        let receipt = self
            .gateway
            .submit_batch(&self.account, &self.instrument, &plan.cancellations, &placements)
            .await
            .map_err(|e| GridError::Submission(format!("{e:#}")))?;

        if planned.phase == CyclePhase::Seeding {
            info!(
                pivot = ?planned.pivot,
                orders = placements.len(),
                "Grid seeded"
            );
        }
        debug!(batch_id = %receipt.batch_id, "Batch accepted");

        self.state.previous_snapshot = Some(index_snapshot(&current));
        summary.cancelled_count = plan.cancellations.len();
        summary.placed_count = placements.len();
        Ok(CycleOutcome::Submitted)
    }

    fn size_placements(
        &mut self,
        geometry: &GridGeometry,
        desired: &[DesiredOrder],
    ) -> Vec<PlacementRequest> {
        desired
            .iter()
            .map(|order| PlacementRequest {
                client_order_id: self.state.next_client_order_id(),
                side: order.side,
                price: from_micros(order.price_micro),
                price_micro: order.price_micro,
                quantity: geometry.order_size(),
            })
            .collect()
    }
}

impl std::fmt::Debug for ReconciliationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationDriver")
            .field("account", &self.account)
            .field("instrument", &self.instrument)
            .field("strategy", &self.strategy)
            .field("cycle_count", &self.cycle_count)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
