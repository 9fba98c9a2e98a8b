//! Order planners — seed, fill-triggered replacement, and full resync.
//!
//! Planners are pure: they take the cycle's geometry and snapshots and
//! return a [`Plan`]. Submission and state updates belong to the driver.

pub mod anchored;
pub mod resync;
pub mod seed;

use std::collections::{BTreeMap, HashSet};

use crate::grid::GridGeometry;
use crate::types::{CyclePhase, DesiredOrder, OpenOrderSnapshot, OrderKey, Strategy};

/// Resting orders keyed by exchange order id. Ordered so that fill
/// processing is deterministic.
pub type SnapshotMap = BTreeMap<String, OpenOrderSnapshot>;

/// Index a snapshot list by order id.
pub fn index_snapshot(orders: &[OpenOrderSnapshot]) -> SnapshotMap {
    orders
        .iter()
        .map(|o| (o.order_id.clone(), o.clone()))
        .collect()
}

/// Orders present in `previous` but missing from `current`, in order-id order.
pub fn closed_orders<'a>(
    previous: &'a SnapshotMap,
    current: &[OpenOrderSnapshot],
) -> Vec<&'a OpenOrderSnapshot> {
    let still_open: HashSet<&str> = current.iter().map(|o| o.order_id.as_str()).collect();
    previous
        .values()
        .filter(|o| !still_open.contains(o.order_id.as_str()))
        .collect()
}

/// Keys of every currently resting order.
pub fn open_keys(current: &[OpenOrderSnapshot]) -> HashSet<OrderKey> {
    current.iter().map(OpenOrderSnapshot::key).collect()
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Work proposed for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Exchange order ids to cancel; submitted before placements.
    pub cancellations: Vec<String>,
    /// Orders to place, unique by `(side, price_micro)`.
    pub placements: Vec<DesiredOrder>,
    /// Orders inferred closed since the previous snapshot.
    pub closed: usize,
    /// Closed orders skipped because their price matched no level.
    pub skipped: usize,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.cancellations.is_empty() && self.placements.is_empty()
    }
}

/// Which planner ran and what it proposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCycle {
    pub phase: CyclePhase,
    /// Pivot used by the planner; `None` for anchored steady-state cycles,
    /// which never re-pivot.
    pub pivot: Option<usize>,
    pub plan: Plan,
}

/// Choose the planner for this cycle and run it.
///
/// Without a previous snapshot the seed planner runs regardless of strategy.
pub fn plan_cycle(
    strategy: Strategy,
    geometry: &GridGeometry,
    mid_micro: i64,
    previous: Option<&SnapshotMap>,
    current: &[OpenOrderSnapshot],
) -> PlannedCycle {
    match (previous, strategy) {
        (None, _) => {
            let pivot = geometry.pivot(mid_micro);
            PlannedCycle {
                phase: CyclePhase::Seeding,
                pivot: Some(pivot),
                plan: seed::plan_seed(geometry, pivot, current),
            }
        }
        (Some(prev), Strategy::Anchored) => PlannedCycle {
            phase: CyclePhase::Steady,
            pivot: None,
            plan: anchored::plan_fill_replacements(geometry, prev, current),
        },
        (Some(prev), Strategy::FullResync) => {
            let pivot = geometry.pivot(mid_micro);
            PlannedCycle {
                phase: CyclePhase::Steady,
                pivot: Some(pivot),
                plan: resync::plan_full_resync(geometry, pivot, Some(prev), current),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
