//! Full-resync planner.
//!
//! Recomputes the seed ladder from the current pivot on every cycle and
//! diffs it against the book. Unlike the anchored planner this re-pivots
//! as the mid moves and cancels anything that is not part of the ladder.

use std::collections::HashSet;

use tracing::debug;

use super::seed::seed_ladder;
use super::{closed_orders, Plan, SnapshotMap};
use crate::grid::GridGeometry;
use crate::types::{OpenOrderSnapshot, OrderKey};

/// Cancel every resting order not in the desired ladder (and any second
/// order on an already-covered key), then place every desired key that is
/// not resting.
pub fn plan_full_resync(
    geometry: &GridGeometry,
    pivot: usize,
    previous: Option<&SnapshotMap>,
    current: &[OpenOrderSnapshot],
) -> Plan {
    let desired = seed_ladder(geometry, pivot);
    let desired_keys: HashSet<OrderKey> = desired.iter().map(|o| o.key()).collect();

    let mut resting: Vec<&OpenOrderSnapshot> = current.iter().collect();
    resting.sort_by(|a, b| a.order_id.cmp(&b.order_id));

    let mut kept: HashSet<OrderKey> = HashSet::new();
    let mut cancellations = Vec::new();
    for order in resting {
        let key = order.key();
        if desired_keys.contains(&key) && kept.insert(key) {
            continue;
        }
        cancellations.push(order.order_id.clone());
    }

    let placements: Vec<_> = desired
        .into_iter()
        .filter(|o| !kept.contains(&o.key()))
        .collect();

    let closed = previous.map(|prev| closed_orders(prev, current).len()).unwrap_or(0);

    debug!(
        pivot,
        kept = kept.len(),
        cancel = cancellations.len(),
        place = placements.len(),
        "Full resync plan built"
    );

    Plan {
        cancellations,
        placements,
        closed,
        skipped: 0,
    }
}
