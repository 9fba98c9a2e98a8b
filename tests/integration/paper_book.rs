//! Paper exchange fixtures shared by the integration tests.
//!
//! Every test uses the reference grid: 0.94 to 0.97 in six steps of 0.005,
//! ten units per order, with the mid starting at 0.955 (pivot 3).

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use gridkeeper::engine::driver::ReconciliationDriver;
use gridkeeper::gateway::paper::PaperExchange;
use gridkeeper::types::{BookParams, GridConfig, OpenOrderSnapshot, Side, Strategy};

pub const ACCOUNT: &str = "0xpaper";
pub const INSTRUMENT: &str = "SUI-USDC";

pub fn reference_grid() -> GridConfig {
    GridConfig {
        min: dec!(0.94),
        max: dec!(0.97),
        level_count: 6,
        order_size: dec!(10),
    }
}

pub fn reference_params() -> BookParams {
    BookParams {
        tick_size: dec!(0.0001),
        lot_size: dec!(1),
        min_size: dec!(1),
    }
}

pub fn paper_exchange() -> Arc<PaperExchange> {
    Arc::new(PaperExchange::new(dec!(0.955), reference_params()))
}

pub fn driver(exchange: &Arc<PaperExchange>, strategy: Strategy) -> ReconciliationDriver {
    ReconciliationDriver::new(
        exchange.clone(),
        ACCOUNT,
        INSTRUMENT,
        reference_grid(),
        strategy,
    )
    .unwrap()
}

/// Resting prices on one side, ascending.
pub async fn prices(exchange: &PaperExchange, side: Side) -> Vec<Decimal> {
    let mut out: Vec<Decimal> = exchange
        .resting()
        .await
        .into_iter()
        .filter(|o| o.side == side)
        .map(|o| Decimal::new(o.price_micro, 6).normalize())
        .collect();
    out.sort();
    out
}

/// The resting order at `price` on `side`.
pub async fn order_at(exchange: &PaperExchange, side: Side, price: Decimal) -> OpenOrderSnapshot {
    exchange
        .resting()
        .await
        .into_iter()
        .find(|o| o.side == side && Decimal::new(o.price_micro, 6) == price)
        .unwrap_or_else(|| panic!("no {side} resting at {price}"))
}
