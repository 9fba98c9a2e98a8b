//! Driver scenarios against the paper exchange.

use rust_decimal_macros::dec;
use std::sync::Arc;

use gridkeeper::gateway::paper::PaperExchange;
use gridkeeper::types::{CycleOutcome, CyclePhase, Side, Strategy};

use crate::paper_book::{driver, order_at, paper_exchange, prices, reference_params};

// ---- Seeding ----

#[tokio::test]
async fn test_reference_ladder_seeds_four_buys_three_sells() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);

    let summary = driver.run_cycle().await;
    assert_eq!(summary.outcome, CycleOutcome::Submitted);
    assert_eq!(summary.phase, Some(CyclePhase::Seeding));
    assert_eq!(summary.pivot_index, Some(3));
    assert_eq!(summary.placed_count, 7);
    assert_eq!(summary.cancelled_count, 0);

    assert_eq!(
        prices(&exchange, Side::Buy).await,
        vec![dec!(0.94), dec!(0.945), dec!(0.95), dec!(0.955)]
    );
    assert_eq!(
        prices(&exchange, Side::Sell).await,
        vec![dec!(0.96), dec!(0.965), dec!(0.97)]
    );
    assert!(exchange.resting().await.iter().all(|o| o.quantity == dec!(10)));
}

#[tokio::test]
async fn test_quiet_market_is_idempotent() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;

    for _ in 0..3 {
        let summary = driver.run_cycle().await;
        assert_eq!(summary.outcome, CycleOutcome::NoOp);
        assert_eq!(summary.phase, Some(CyclePhase::Steady));
        assert_eq!(summary.existing_count, 7);
    }
    assert_eq!(exchange.batches_submitted().await, 1);
}

// ---- Anchored replacement ----

#[tokio::test]
async fn test_externally_cancelled_buy_is_replaced_one_level_up() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;
    driver.run_cycle().await;

    let buy = order_at(&exchange, Side::Buy, dec!(0.95)).await;
    assert!(exchange.cancel_externally(&buy.order_id).await);

    let summary = driver.run_cycle().await;
    assert_eq!(summary.outcome, CycleOutcome::Submitted);
    assert_eq!(summary.closed_count, 1);
    assert_eq!(summary.placed_count, 1);
    assert_eq!(summary.cancelled_count, 0);

    let sell = order_at(&exchange, Side::Sell, dec!(0.955)).await;
    assert_eq!(sell.quantity, dec!(10));
    assert_eq!(exchange.resting().await.len(), 7);
}

#[tokio::test]
async fn test_mid_drop_fills_buys_and_places_sells_above() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;
    driver.run_cycle().await;

    // Fills BUY@0.955 and BUY@0.95.
    let fills = exchange.set_mid(dec!(0.9475)).await.unwrap();
    assert_eq!(fills.len(), 2);

    let summary = driver.run_cycle().await;
    assert_eq!(summary.closed_count, 2);
    // BUY@0.95 -> SELL@0.955; BUY@0.955 -> SELL@0.96 is already resting.
    assert_eq!(summary.placed_count, 1);
    assert_eq!(
        prices(&exchange, Side::Sell).await,
        vec![dec!(0.955), dec!(0.96), dec!(0.965), dec!(0.97)]
    );
    assert_eq!(prices(&exchange, Side::Buy).await, vec![dec!(0.94), dec!(0.945)]);

    // Anchored mode never re-pivots.
    assert_eq!(driver.run_cycle().await.outcome, CycleOutcome::NoOp);
}

#[tokio::test]
async fn test_round_trip_restores_buy() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;
    driver.run_cycle().await;

    exchange.set_mid(dec!(0.9475)).await.unwrap();
    driver.run_cycle().await;
    // Let the next snapshot see the new SELL@0.955 before it fills.
    driver.run_cycle().await;

    // Back up through 0.955: the new SELL@0.955 fills.
    let fills = exchange.set_mid(dec!(0.9575)).await.unwrap();
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].side, Side::Sell);

    let summary = driver.run_cycle().await;
    assert_eq!(summary.placed_count, 1);
    assert_eq!(
        prices(&exchange, Side::Buy).await,
        vec![dec!(0.94), dec!(0.945), dec!(0.95)]
    );
}

#[tokio::test]
async fn test_sell_fill_at_top_has_no_replacement() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;
    driver.run_cycle().await;

    let top = order_at(&exchange, Side::Sell, dec!(0.97)).await;
    exchange.cancel_externally(&top.order_id).await;

    let summary = driver.run_cycle().await;
    assert_eq!(summary.closed_count, 1);
    assert_eq!(summary.placed_count, 0);
    assert_eq!(summary.outcome, CycleOutcome::NoOp);
    assert_eq!(
        prices(&exchange, Side::Buy).await,
        vec![dec!(0.94), dec!(0.945), dec!(0.95), dec!(0.955)]
    );
}

#[tokio::test]
async fn test_buy_fill_at_bottom_has_no_replacement() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;
    driver.run_cycle().await;

    let bottom = order_at(&exchange, Side::Buy, dec!(0.94)).await;
    exchange.cancel_externally(&bottom.order_id).await;

    let summary = driver.run_cycle().await;
    assert_eq!(summary.closed_count, 1);
    assert_eq!(summary.placed_count, 0);
    assert_eq!(
        prices(&exchange, Side::Sell).await,
        vec![dec!(0.96), dec!(0.965), dec!(0.97)]
    );
}

#[tokio::test]
async fn test_buy_fill_at_top_has_no_replacement() {
    // Mid above the grid seeds BUYs on every level.
    let exchange = Arc::new(PaperExchange::new(dec!(0.975), reference_params()));
    let mut driver = driver(&exchange, Strategy::Anchored);
    let seeded = driver.run_cycle().await;
    assert_eq!(seeded.pivot_index, Some(6));
    assert_eq!(prices(&exchange, Side::Buy).await.len(), 7);
    driver.run_cycle().await;

    let top = order_at(&exchange, Side::Buy, dec!(0.97)).await;
    exchange.cancel_externally(&top.order_id).await;

    let summary = driver.run_cycle().await;
    assert_eq!(summary.closed_count, 1);
    assert_eq!(summary.placed_count, 0);
    assert_eq!(summary.outcome, CycleOutcome::NoOp);
    assert!(prices(&exchange, Side::Sell).await.is_empty());
}

// ---- Failure handling ----

#[tokio::test]
async fn test_rejected_batch_is_retried_next_cycle() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;
    driver.run_cycle().await;

    let buy = order_at(&exchange, Side::Buy, dec!(0.95)).await;
    exchange.cancel_externally(&buy.order_id).await;
    exchange.set_submit_error(Some("sequencer busy")).await;

    let failed = driver.run_cycle().await;
    assert_eq!(failed.outcome, CycleOutcome::Failed);
    assert!(failed.error.unwrap().contains("sequencer busy"));
    assert_eq!(exchange.resting().await.len(), 6);

    exchange.set_submit_error(None).await;
    let retried = driver.run_cycle().await;
    assert_eq!(retried.outcome, CycleOutcome::Submitted);
    assert_eq!(retried.placed_count, 1);
    order_at(&exchange, Side::Sell, dec!(0.955)).await;
}

#[tokio::test]
async fn test_read_failure_submits_nothing() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;

    exchange.set_read_error(Some("rpc timeout")).await;
    let failed = driver.run_cycle().await;
    assert_eq!(failed.outcome, CycleOutcome::Failed);
    assert!(failed.error.unwrap().starts_with("Gateway read error"));
    assert_eq!(exchange.batches_submitted().await, 1);

    exchange.set_read_error(None).await;
    assert_eq!(driver.run_cycle().await.outcome, CycleOutcome::NoOp);
}

#[tokio::test]
async fn test_tick_change_fails_cycle_until_restored() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::Anchored);
    driver.run_cycle().await;

    let mut coarse = reference_params();
    coarse.tick_size = dec!(0.01);
    exchange.set_params(coarse).await;
    let failed = driver.run_cycle().await;
    assert_eq!(failed.outcome, CycleOutcome::Failed);
    assert!(failed.error.unwrap().starts_with("Geometry error"));

    exchange.set_params(reference_params()).await;
    assert_eq!(driver.run_cycle().await.outcome, CycleOutcome::NoOp);
}

// ---- Full resync ----

#[tokio::test]
async fn test_full_resync_follows_the_mid() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::FullResync);
    driver.run_cycle().await;

    exchange.set_mid(dec!(0.9475)).await.unwrap();
    let summary = driver.run_cycle().await;
    assert_eq!(summary.phase, Some(CyclePhase::Steady));
    assert_eq!(summary.pivot_index, Some(1));
    assert_eq!(summary.placed_count, 2);
    assert_eq!(summary.cancelled_count, 0);
    assert_eq!(prices(&exchange, Side::Buy).await, vec![dec!(0.94), dec!(0.945)]);
    assert_eq!(
        prices(&exchange, Side::Sell).await,
        vec![dec!(0.95), dec!(0.955), dec!(0.96), dec!(0.965), dec!(0.97)]
    );

    assert_eq!(driver.run_cycle().await.outcome, CycleOutcome::NoOp);

    // Back to 0.955: SELL@0.95 fills, SELL@0.955 is now on the BUY side.
    exchange.set_mid(dec!(0.955)).await.unwrap();
    let summary = driver.run_cycle().await;
    assert_eq!(summary.pivot_index, Some(3));
    assert_eq!(summary.cancelled_count, 1);
    assert_eq!(summary.placed_count, 2);
    assert_eq!(
        prices(&exchange, Side::Buy).await,
        vec![dec!(0.94), dec!(0.945), dec!(0.95), dec!(0.955)]
    );
    assert_eq!(
        prices(&exchange, Side::Sell).await,
        vec![dec!(0.96), dec!(0.965), dec!(0.97)]
    );
}
