//! Seed planner — lays the initial ladder around the pivot.

use tracing::debug;

use super::{open_keys, Plan};
use crate::grid::GridGeometry;
use crate::types::{DesiredOrder, OpenOrderSnapshot, Side};

/// The full desired ladder: BUY at every level at or below the pivot,
/// SELL at every level above it.
pub fn seed_ladder(geometry: &GridGeometry, pivot: usize) -> Vec<DesiredOrder> {
    geometry
        .levels()
        .iter()
        .map(|level| {
            let side = if level.index <= pivot { Side::Buy } else { Side::Sell };
            DesiredOrder::new(side, level.price_micro)
        })
        .collect()
}

/// Seed plan for a cold start. Never cancels; levels already resting on
/// the book (left over from an earlier run) are not placed twice.
pub fn plan_seed(geometry: &GridGeometry, pivot: usize, current: &[OpenOrderSnapshot]) -> Plan {
    let open = open_keys(current);
    let ladder = seed_ladder(geometry, pivot);
    let desired = ladder.len();

    let placements: Vec<DesiredOrder> = ladder
        .into_iter()
        .filter(|order| !open.contains(&order.key()))
        .collect();

    debug!(
        pivot,
        desired,
        already_open = desired - placements.len(),
        "Seed plan built"
    );

    Plan {
        placements,
        ..Plan::default()
    }
}
