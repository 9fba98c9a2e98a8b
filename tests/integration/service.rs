//! Both schedulers driving the paper exchange.

use rust_decimal_macros::dec;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use gridkeeper::engine::runner::run_loop;
use gridkeeper::engine::service::{GridService, StartOutcome, TickOutcome};
use gridkeeper::types::{CycleOutcome, CyclePhase, Side, Strategy};

use crate::paper_book::{driver, order_at, paper_exchange, reference_grid, ACCOUNT, INSTRUMENT};

const HOUR: Duration = Duration::from_secs(3_600);

#[tokio::test]
async fn test_service_replaces_fills_on_manual_tick() {
    let exchange = paper_exchange();
    let service = GridService::new(exchange.clone(), ACCOUNT, INSTRUMENT);
    let mut events = service.subscribe();

    let started = service
        .start(reference_grid(), Strategy::Anchored, HOUR)
        .await
        .unwrap();
    assert_eq!(started, StartOutcome::Started);
    let seeded = events.recv().await.unwrap();
    assert_eq!(seeded.phase, Some(CyclePhase::Seeding));

    // Adopt the seeded book before anything fills.
    assert!(matches!(service.tick().await, Ok(TickOutcome::Completed(_))));

    exchange.set_mid(dec!(0.9475)).await.unwrap();
    let TickOutcome::Completed(summary) = service.tick().await.unwrap() else {
        panic!("no cycle was in flight");
    };
    assert_eq!(summary.closed_count, 2);
    assert_eq!(summary.placed_count, 1);
    order_at(&exchange, Side::Sell, dec!(0.955)).await;

    let status = service.status().await;
    assert!(status.running);
    assert_eq!(status.cycles_run, 3);
    assert_eq!(status.strategy, Some(Strategy::Anchored));
    assert_eq!(status.last_cycle_summary.unwrap().cycle_number, 3);

    let recent = service.recent_cycles().await;
    let numbers: Vec<u64> = recent.iter().map(|s| s.cycle_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    assert!(service.stop().await);
    assert!(service.tick().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_service_timer_floors_short_interval() {
    let exchange = paper_exchange();
    let service = GridService::new(exchange.clone(), ACCOUNT, INSTRUMENT);
    let mut events = service.subscribe();

    service
        .start(reference_grid(), Strategy::FullResync, Duration::from_millis(10))
        .await
        .unwrap();
    assert_eq!(service.status().await.interval_ms, Some(1_000));

    for expected in 1..=3u64 {
        let summary = events.recv().await.unwrap();
        assert_eq!(summary.cycle_number, expected);
    }
    service.stop().await;
    assert_eq!(exchange.resting().await.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_run_loop_tracks_a_moving_mid() {
    let exchange = paper_exchange();
    let mut driver = driver(&exchange, Strategy::FullResync);
    let shutdown = CancellationToken::new();

    let mover = {
        let exchange = exchange.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            // Between the second and third cycles.
            tokio::time::sleep(Duration::from_millis(1_500)).await;
            exchange.set_mid(dec!(0.9475)).await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            shutdown.cancel();
        })
    };

    let mut summaries = Vec::new();
    run_loop(&mut driver, Duration::from_secs(1), shutdown, |s| summaries.push(s.clone())).await;
    mover.await.unwrap();

    assert!(summaries.len() >= 3);
    assert_eq!(summaries[0].outcome, CycleOutcome::Submitted);
    assert_eq!(summaries[1].outcome, CycleOutcome::NoOp);
    assert_eq!(summaries[2].pivot_index, Some(1));
    assert_eq!(summaries[2].placed_count, 2);
    assert_eq!(exchange.resting().await.len(), 7);
}
