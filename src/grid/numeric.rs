//! Integer micro-unit arithmetic.
//!
//! Prices are compared and deduplicated as `i64` micro-units so that two
//! levels derived along different paths compare equal exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::GridError;

/// Scale between a decimal price and its micro-unit representation.
pub const MICROS_PER_UNIT: i64 = 1_000_000;

/// Convert a decimal value to micro-units, rounding half away from zero.
pub fn to_micros(value: Decimal) -> Result<i64, GridError> {
    value
        .checked_mul(Decimal::from(MICROS_PER_UNIT))
        .map(|scaled| scaled.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|scaled| scaled.to_i64())
        .ok_or_else(|| GridError::Geometry(format!("value {value} is out of range for micro-units")))
}

/// Convert a decimal value that must already be a whole number of
/// micro-units. Used for exchange ticks and grid bounds, where rounding
/// would move levels off the real tick.
pub fn to_micros_exact(value: Decimal) -> Result<i64, GridError> {
    let scaled = value
        .checked_mul(Decimal::from(MICROS_PER_UNIT))
        .ok_or_else(|| GridError::Geometry(format!("value {value} is out of range for micro-units")))?;
    if !scaled.fract().is_zero() {
        return Err(GridError::Geometry(format!(
            "value {value} is finer than one micro-unit"
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| GridError::Geometry(format!("value {value} is out of range for micro-units")))
}

/// Convert micro-units back to a normalised decimal.
pub fn from_micros(micros: i64) -> Decimal {
    Decimal::new(micros, 6).normalize()
}

/// Round down to a multiple of `tick`. `tick` must be positive.
pub fn floor_to_tick(micros: i64, tick: i64) -> i64 {
    micros.div_euclid(tick) * tick
}

/// Round up to a multiple of `tick`. `tick` must be positive.
pub fn ceil_to_tick(micros: i64, tick: i64) -> i64 {
    let rem = micros.rem_euclid(tick);
    if rem == 0 {
        micros
    } else {
        micros - rem + tick
    }
}

/// Round a quantity down to a whole number of lots. `lot` must be positive.
pub fn round_down_to_lot(size: Decimal, lot: Decimal) -> Decimal {
    ((size / lot).floor() * lot).normalize()
}
