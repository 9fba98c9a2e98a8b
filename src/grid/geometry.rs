//! Grid geometry — price ladder and order sizing.
//!
//! Pure functions; the driver rebuilds the geometry every cycle from the
//! latest book params so a tick or lot change on the exchange is picked up
//! without any cache invalidation.

use rust_decimal::Decimal;
use tracing::debug;

use super::numeric::{ceil_to_tick, floor_to_tick, from_micros, round_down_to_lot, to_micros_exact};
use super::pivot;
use crate::types::{BookParams, GridConfig, GridError, PriceLevel};

// ---------------------------------------------------------------------------
// Ladder construction
// ---------------------------------------------------------------------------

/// Build `level_count + 1` strictly increasing, tick-aligned levels.
///
/// `min` is rounded down and `max` up to the tick. The step is the raw
/// interval rounded down to the tick (never below one tick), and the last
/// level is pinned to the rounded `max` so the ceiling is always hit.
/// A tick, `min` or `max` finer than one micro-unit is a geometry error.
pub fn build_levels(
    min: Decimal,
    max: Decimal,
    level_count: u32,
    tick_size: Decimal,
) -> Result<Vec<PriceLevel>, GridError> {
    if max <= min {
        return Err(GridError::Configuration(format!(
            "max ({max}) must be greater than min ({min})"
        )));
    }
    if level_count < 2 {
        return Err(GridError::Configuration(format!(
            "level_count must be at least 2, got {level_count}"
        )));
    }

    let tick = to_micros_exact(tick_size)?;
    if tick <= 0 {
        return Err(GridError::Geometry(format!(
            "tick size {tick_size} is below one micro-unit"
        )));
    }

    let min_micro = floor_to_tick(to_micros_exact(min)?, tick);
    let max_micro = ceil_to_tick(to_micros_exact(max)?, tick);
    let intervals = i64::from(level_count);

    let raw_step = (max_micro - min_micro) / intervals;
    let step = floor_to_tick(raw_step, tick).max(tick);
    if step <= 0 {
        return Err(GridError::Geometry(format!("non-positive step {step}")));
    }

    let mut levels = Vec::with_capacity(level_count as usize + 1);
    for i in 0..=intervals {
        let price_micro = step
            .checked_mul(i)
            .and_then(|offset| min_micro.checked_add(offset))
            .ok_or_else(|| GridError::Geometry("ladder overflows micro-unit range".into()))?;
        levels.push(PriceLevel {
            index: i as usize,
            price_micro,
        });
    }
    if let Some(last) = levels.last_mut() {
        last.price_micro = max_micro;
    }

    for pair in levels.windows(2) {
        if pair[1].price_micro <= pair[0].price_micro {
            return Err(GridError::Geometry(format!(
                "levels {} and {} are not increasing ({} >= {}); \
                 min/max/level_count/tick are incompatible",
                pair[0].index,
                pair[1].index,
                from_micros(pair[0].price_micro),
                from_micros(pair[1].price_micro),
            )));
        }
    }

    Ok(levels)
}

/// Lot-round the configured order size and enforce the exchange minimum.
pub fn size_order(order_size: Decimal, params: &BookParams) -> Result<Decimal, GridError> {
    if params.lot_size <= Decimal::ZERO {
        return Err(GridError::Geometry(format!(
            "lot size must be positive, got {}",
            params.lot_size
        )));
    }
    let rounded = round_down_to_lot(order_size, params.lot_size);
    if rounded <= Decimal::ZERO || rounded < params.min_size {
        return Err(GridError::Geometry(format!(
            "order size {order_size} rounds to {rounded} (lot {}), below minimum {}",
            params.lot_size, params.min_size
        )));
    }
    Ok(rounded)
}

// ---------------------------------------------------------------------------
// GridGeometry
// ---------------------------------------------------------------------------

/// Ladder plus sized quantity for one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGeometry {
    levels: Vec<PriceLevel>,
    order_size: Decimal,
}

impl GridGeometry {
    /// Derive the geometry from the run's config and the current book params.
    pub fn build(config: &GridConfig, params: &BookParams) -> Result<Self, GridError> {
        config.validate()?;
        let levels = build_levels(config.min, config.max, config.level_count, params.tick_size)?;
        let order_size = size_order(config.order_size, params)?;

        debug!(
            levels = levels.len(),
            first = %from_micros(levels[0].price_micro),
            last = %from_micros(levels[levels.len() - 1].price_micro),
            order_size = %order_size,
            "Grid geometry built"
        );

        Ok(Self { levels, order_size })
    }

    pub fn levels(&self) -> &[PriceLevel] {
        &self.levels
    }

    /// Lot-rounded quantity for every grid order.
    pub fn order_size(&self) -> Decimal {
        self.order_size
    }

    /// Index of the top level (equal to the configured interval count).
    pub fn top_index(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn price_at(&self, index: usize) -> Option<i64> {
        self.levels.get(index).map(|l| l.price_micro)
    }

    /// Exact-match lookup of a level by price.
    pub fn index_of(&self, price_micro: i64) -> Option<usize> {
        pivot::level_index(&self.levels, price_micro)
    }

    /// Pivot index for the given mid price.
    pub fn pivot(&self, mid_micro: i64) -> usize {
        pivot::locate_pivot(&self.levels, mid_micro)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
