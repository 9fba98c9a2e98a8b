//! Exchange gateway abstraction.
//!
//! The engine never builds or signs exchange transactions itself: it reads
//! market state and hands a finished batch to a gateway. Transport,
//! authentication, and transaction construction live behind this trait.

pub mod paper;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{BatchReceipt, BookParams, OpenOrderSnapshot, PlacementRequest};

/// Market access for one exchange.
///
/// Reads are independent and idempotent. `submit_batch` must apply the
/// batch atomically: cancellations first, then placements, all or nothing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Current mid price of the instrument.
    async fn mid_price(&self, instrument: &str) -> Result<Decimal>;

    /// Tick, lot, and minimum size currently enforced for the instrument.
    async fn book_params(&self, instrument: &str) -> Result<BookParams>;

    /// Every order resting for the account on the instrument.
    async fn open_orders(&self, account: &str, instrument: &str) -> Result<Vec<OpenOrderSnapshot>>;

    /// Submit one atomic batch of cancellations followed by placements.
    async fn submit_batch(
        &self,
        account: &str,
        instrument: &str,
        cancellations: &[String],
        placements: &[PlacementRequest],
    ) -> Result<BatchReceipt>;
}
