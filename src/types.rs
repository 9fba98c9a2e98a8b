//! Shared types for the GRIDKEEPER engine.
//!
//! These types form the data model used across all modules. Prices that
//! take part in comparisons or deduplication are carried as integer
//! micro-units (`price_micro`, scaled by 1,000,000); human-facing values
//! (config, mid price, quantities) stay as `Decimal`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Reconciliation strategy, fixed for the life of one running engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Seed once, then only replace fills one level across. Never cancels.
    Anchored,
    /// Recompute the whole ladder from the current pivot every cycle.
    FullResync,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Anchored => write!(f, "anchored"),
            Strategy::FullResync => write!(f, "full-resync"),
        }
    }
}

impl std::str::FromStr for Strategy {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anchored" | "fill-triggered" => Ok(Strategy::Anchored),
            "full-resync" | "full_resync" | "resync" => Ok(Strategy::FullResync),
            other => Err(GridError::Configuration(format!(
                "unknown strategy '{other}' (expected 'anchored' or 'full-resync')"
            ))),
        }
    }
}

/// Which planner family ran in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Seeding,
    Steady,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CyclePhase::Seeding => write!(f, "SEEDING"),
            CyclePhase::Steady => write!(f, "STEADY"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration inputs
// ---------------------------------------------------------------------------

/// User-supplied grid parameters. Immutable for one engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Lowest grid price.
    pub min: Decimal,
    /// Highest grid price.
    pub max: Decimal,
    /// Number of intervals; the ladder has `level_count + 1` lines.
    pub level_count: u32,
    /// Quantity per order, before lot rounding.
    pub order_size: Decimal,
}

impl GridConfig {
    /// Check the parameters that do not depend on the exchange.
    pub fn validate(&self) -> Result<(), GridError> {
        if self.max <= self.min {
            return Err(GridError::Configuration(format!(
                "max ({}) must be greater than min ({})",
                self.max, self.min
            )));
        }
        if self.level_count < 2 {
            return Err(GridError::Configuration(format!(
                "level_count must be at least 2, got {}",
                self.level_count
            )));
        }
        if self.order_size <= Decimal::ZERO {
            return Err(GridError::Configuration(format!(
                "order_size must be positive, got {}",
                self.order_size
            )));
        }
        Ok(())
    }
}

/// Exchange-imposed quantization for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookParams {
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub min_size: Decimal,
}

// ---------------------------------------------------------------------------
// Ladder and orders
// ---------------------------------------------------------------------------

/// One line of the grid ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub index: usize,
    pub price_micro: i64,
}

/// Deduplication key: one resting order per (side, price).
pub type OrderKey = (Side, i64);

/// An order the planner wants resting on the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesiredOrder {
    pub side: Side,
    pub price_micro: i64,
}

impl DesiredOrder {
    pub fn new(side: Side, price_micro: i64) -> Self {
        Self { side, price_micro }
    }

    pub fn key(&self) -> OrderKey {
        (self.side, self.price_micro)
    }
}

impl fmt::Display for DesiredOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.side,
            crate::grid::numeric::from_micros(self.price_micro)
        )
    }
}

/// A resting order as reported by the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrderSnapshot {
    pub order_id: String,
    pub side: Side,
    pub price_micro: i64,
    pub quantity: Decimal,
    pub filled_quantity: Decimal,
}

impl OpenOrderSnapshot {
    pub fn key(&self) -> OrderKey {
        (self.side, self.price_micro)
    }
}

/// A desired order sized and tagged for submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRequest {
    pub client_order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub price_micro: i64,
    pub quantity: Decimal,
}

/// Acknowledgement of a submitted batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReceipt {
    pub batch_id: String,
    pub cancelled: usize,
    pub placed: usize,
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Cycle summary
// ---------------------------------------------------------------------------

/// How a reconciliation cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CycleOutcome {
    /// A batch was built and accepted by the gateway.
    Submitted,
    /// Nothing to cancel or place.
    NoOp,
    /// Aborted or rejected; state left as it was before the cycle.
    Failed,
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Submitted => write!(f, "submitted"),
            CycleOutcome::NoOp => write!(f, "no-op"),
            CycleOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Structured report emitted once per completed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub cycle_number: u64,
    pub timestamp: DateTime<Utc>,
    pub strategy: Strategy,
    /// `None` when the cycle failed before a planner was chosen.
    pub phase: Option<CyclePhase>,
    pub mid_price: Option<Decimal>,
    pub pivot_index: Option<usize>,
    /// Resting orders in the current snapshot.
    pub existing_count: usize,
    /// Orders that disappeared since the previous snapshot.
    pub closed_count: usize,
    pub placed_count: usize,
    pub cancelled_count: usize,
    /// Closed orders whose price matched no grid level.
    pub skipped_count: usize,
    pub outcome: CycleOutcome,
    pub error: Option<String>,
}

impl CycleSummary {
    pub fn is_failure(&self) -> bool {
        self.outcome == CycleOutcome::Failed
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mid = self
            .mid_price
            .map(|m| m.to_string())
            .unwrap_or_else(|| "?".to_string());
        write!(
            f,
            "Cycle #{} [{}]: mid={} existing={} closed={} placed={} cancelled={} -> {}",
            self.cycle_number,
            self.strategy,
            mid,
            self.existing_count,
            self.closed_count,
            self.placed_count,
            self.cancelled_count,
            self.outcome,
        )?;
        if let Some(err) = &self.error {
            write!(f, " ({err})")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for GRIDKEEPER.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Gateway read error: {0}")]
    GatewayRead(String),

    #[error("Submission error: {0}")]
    Submission(String),

    #[error("Engine already running with a different configuration")]
    AlreadyRunning,

    #[error("Engine is not running")]
    NotRunning,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
