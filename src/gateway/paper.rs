//! Paper exchange — an in-memory gateway for demo runs and tests.
//!
//! Holds a single book of resting orders. Moving the mid price fills every
//! BUY priced strictly above the new mid and every SELL strictly below it,
//! which is all the engine can observe of a real fill: the order is gone
//! from the next snapshot. Errors can be injected for reads and submissions.

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::ExchangeGateway;
use crate::grid::numeric::{from_micros, to_micros};
use crate::types::{BatchReceipt, BookParams, OpenOrderSnapshot, PlacementRequest, Side};

/// A fill produced by a mid-price move.
#[derive(Debug, Clone, Serialize)]
pub struct PaperFill {
    pub order_id: String,
    pub side: Side,
    pub price: Decimal,
    pub quantity: Decimal,
    pub timestamp: DateTime<Utc>,
}

struct PaperBook {
    mid: Decimal,
    params: BookParams,
    orders: BTreeMap<String, OpenOrderSnapshot>,
    fills: Vec<PaperFill>,
    next_order_id: u64,
    batches: u64,
    read_error: Option<String>,
    submit_error: Option<String>,
}

/// In-memory single-instrument exchange.
pub struct PaperExchange {
    book: Mutex<PaperBook>,
}

impl PaperExchange {
    pub fn new(mid: Decimal, params: BookParams) -> Self {
        Self {
            book: Mutex::new(PaperBook {
                mid,
                params,
                orders: BTreeMap::new(),
                fills: Vec::new(),
                next_order_id: 1,
                batches: 0,
                read_error: None,
                submit_error: None,
            }),
        }
    }

    /// Move the mid price and fill every order it crossed.
    pub async fn set_mid(&self, mid: Decimal) -> Result<Vec<PaperFill>> {
        let mid_micro = to_micros(mid)?;
        let mut book = self.book.lock().await;
        book.mid = mid;

        let crossed: Vec<String> = book
            .orders
            .values()
            .filter(|o| match o.side {
                Side::Buy => o.price_micro > mid_micro,
                Side::Sell => o.price_micro < mid_micro,
            })
            .map(|o| o.order_id.clone())
            .collect();

        let now = Utc::now();
        let mut filled = Vec::with_capacity(crossed.len());
        for order_id in crossed {
            if let Some(order) = book.orders.remove(&order_id) {
                filled.push(PaperFill {
                    order_id: order.order_id,
                    side: order.side,
                    price: from_micros(order.price_micro),
                    quantity: order.quantity,
                    timestamp: now,
                });
            }
        }

        if !filled.is_empty() {
            info!(mid = %mid, fills = filled.len(), "Paper fills");
        }
        book.fills.extend(filled.iter().cloned());
        Ok(filled)
    }

    /// Replace the book params (e.g. to simulate a tick-size change).
    pub async fn set_params(&self, params: BookParams) {
        self.book.lock().await.params = params;
    }

    /// Remove a resting order without a fill, as a user cancelling from
    /// another client would.
    pub async fn cancel_externally(&self, order_id: &str) -> bool {
        self.book.lock().await.orders.remove(order_id).is_some()
    }

    /// Make every read fail with `message` until cleared.
    pub async fn set_read_error(&self, message: Option<&str>) {
        self.book.lock().await.read_error = message.map(str::to_string);
    }

    /// Make every submission fail with `message` until cleared.
    pub async fn set_submit_error(&self, message: Option<&str>) {
        self.book.lock().await.submit_error = message.map(str::to_string);
    }

    pub async fn resting(&self) -> Vec<OpenOrderSnapshot> {
        self.book.lock().await.orders.values().cloned().collect()
    }

    pub async fn fills(&self) -> Vec<PaperFill> {
        self.book.lock().await.fills.clone()
    }

    pub async fn batches_submitted(&self) -> u64 {
        self.book.lock().await.batches
    }
}

impl PaperBook {
    fn check_read(&self) -> Result<()> {
        match &self.read_error {
            Some(msg) => Err(anyhow!("{msg}")),
            None => Ok(()),
        }
    }

    /// Reject the whole batch if any part of it would be refused.
    fn validate(&self, cancellations: &[String], placements: &[PlacementRequest]) -> Result<()> {
        if let Some(id) = cancellations.iter().find(|id| !self.orders.contains_key(*id)) {
            bail!("cannot cancel unknown order {id}");
        }

        let tick = to_micros(self.params.tick_size)?;
        for p in placements {
            if tick <= 0 || p.price_micro % tick != 0 {
                bail!("price {} is not a multiple of tick {}", p.price, self.params.tick_size);
            }
            if p.quantity < self.params.min_size {
                bail!("quantity {} below minimum {}", p.quantity, self.params.min_size);
            }
            if self.params.lot_size > Decimal::ZERO && !(p.quantity % self.params.lot_size).is_zero() {
                bail!("quantity {} is not a multiple of lot {}", p.quantity, self.params.lot_size);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeGateway for PaperExchange {
    async fn mid_price(&self, _instrument: &str) -> Result<Decimal> {
        let book = self.book.lock().await;
        book.check_read()?;
        Ok(book.mid)
    }

    async fn book_params(&self, _instrument: &str) -> Result<BookParams> {
        let book = self.book.lock().await;
        book.check_read()?;
        Ok(book.params.clone())
    }

    async fn open_orders(&self, _account: &str, _instrument: &str) -> Result<Vec<OpenOrderSnapshot>> {
        let book = self.book.lock().await;
        book.check_read()?;
        Ok(book.orders.values().cloned().collect())
    }

    async fn submit_batch(
        &self,
        account: &str,
        instrument: &str,
        cancellations: &[String],
        placements: &[PlacementRequest],
    ) -> Result<BatchReceipt> {
        let mut book = self.book.lock().await;
        if let Some(msg) = &book.submit_error {
            bail!("{msg}");
        }
        book.validate(cancellations, placements)?;

        for id in cancellations {
            book.orders.remove(id);
        }
        for p in placements {
            let order_id = format!("P{:06}", book.next_order_id);
            book.next_order_id += 1;
            book.orders.insert(
                order_id.clone(),
                OpenOrderSnapshot {
                    order_id,
                    side: p.side,
                    price_micro: p.price_micro,
                    quantity: p.quantity,
                    filled_quantity: Decimal::ZERO,
                },
            );
        }
        book.batches += 1;

        debug!(
            account,
            instrument,
            cancelled = cancellations.len(),
            placed = placements.len(),
            resting = book.orders.len(),
            "Paper batch applied"
        );

        Ok(BatchReceipt {
            batch_id: uuid::Uuid::new_v4().to_string(),
            cancelled: cancellations.len(),
            placed: placements.len(),
            timestamp: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
