//! Fill-triggered replacement planner for the anchored strategy.
//!
//! There is no fill event from the exchange: an order that was in the
//! previous snapshot and is gone from the current one is treated as
//! filled, whatever the real reason. Each fill yields at most one
//! replacement one level across, and nothing is ever cancelled.

use tracing::{debug, warn};

use super::{closed_orders, open_keys, Plan, SnapshotMap};
use crate::grid::numeric::from_micros;
use crate::grid::GridGeometry;
use crate::types::{DesiredOrder, OpenOrderSnapshot, Side};

/// Propose one replacement per inferred fill.
///
/// A filled BUY at level `i` asks for a SELL at `i + 1`; a filled SELL at
/// `i` asks for a BUY at `i - 1`. Fills on the bottom or top level are not
/// replaced, whatever their side. Targets already resting and targets
/// already proposed this cycle are dropped.
pub fn plan_fill_replacements(
    geometry: &GridGeometry,
    previous: &SnapshotMap,
    current: &[OpenOrderSnapshot],
) -> Plan {
    let closed = closed_orders(previous, current);
    let mut proposed = open_keys(current);
    let mut plan = Plan {
        closed: closed.len(),
        ..Plan::default()
    };

    for filled in closed {
        let Some(index) = geometry.index_of(filled.price_micro) else {
            warn!(
                order_id = %filled.order_id,
                side = %filled.side,
                price = %from_micros(filled.price_micro),
                "Closed order does not sit on a grid level, skipping"
            );
            plan.skipped += 1;
            continue;
        };

        if index == 0 || index == geometry.top_index() {
            debug!(
                order_id = %filled.order_id,
                side = %filled.side,
                index,
                "Fill at range boundary, no replacement"
            );
            continue;
        }

        let target = match filled.side {
            Side::Buy => index + 1,
            Side::Sell => index - 1,
        };
        let Some(price_micro) = geometry.price_at(target) else {
            continue;
        };

        let replacement = DesiredOrder::new(filled.side.opposite(), price_micro);
        if proposed.insert(replacement.key()) {
            debug!(
                order_id = %filled.order_id,
                from_index = index,
                to_index = target,
                replacement = %replacement,
                "Fill replaced"
            );
            plan.placements.push(replacement);
        }
    }

    plan
}
