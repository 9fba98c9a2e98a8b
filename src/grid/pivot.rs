//! Pivot location on a price ladder.

use crate::types::PriceLevel;

/// Greatest index whose level is at or below `mid_micro`, clamped to the
/// ladder. A level exactly at the mid counts as "at or below" and becomes
/// the BUY anchor. A mid below the whole ladder clamps to index 0.
pub fn locate_pivot(levels: &[PriceLevel], mid_micro: i64) -> usize {
    let at_or_below = levels.partition_point(|l| l.price_micro <= mid_micro);
    at_or_below
        .saturating_sub(1)
        .min(levels.len().saturating_sub(1))
}

/// Index of the level priced exactly at `price_micro`, if any.
pub fn level_index(levels: &[PriceLevel], price_micro: i64) -> Option<usize> {
    levels
        .binary_search_by_key(&price_micro, |l| l.price_micro)
        .ok()
        .map(|pos| levels[pos].index)
}
