//! GRIDKEEPER — anchored grid reconciliation engine
//!
//! Entry point. Loads configuration, initialises structured logging, and
//! runs the engine against the paper exchange, either as a free-running
//! loop or as a supervised service behind the control API.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use gridkeeper::config::{self, RunMode};
use gridkeeper::dashboard;
use gridkeeper::engine::driver::ReconciliationDriver;
use gridkeeper::engine::runner::run_loop;
use gridkeeper::engine::service::GridService;
use gridkeeper::gateway::paper::PaperExchange;
use gridkeeper::gateway::ExchangeGateway;
use gridkeeper::types::CycleSummary;

const BANNER: &str = r#"
  ____ ____  ___ ____  _  _______ _____ ____  _____ ____
 / ___|  _ \|_ _|  _ \| |/ / ____| ____|  _ \| ____|  _ \
| |  _| |_) || || | | | ' /|  _| |  _| | |_) |  _| | |_) |
| |_| |  _ < | || |_| | . \| |___| |___|  __/| |___|  _ <
 \____|_| \_\___|____/|_|\_\_____|_____|_|   |_____|_| \_\

  Anchored grid reconciliation engine
  v0.1.0 — paper exchange
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        account = %cfg.engine.account,
        instrument = %cfg.engine.instrument,
        strategy = %cfg.engine.strategy,
        mode = ?cfg.engine.mode,
        interval_ms = cfg.engine.interval_ms,
        "GRIDKEEPER starting up"
    );

    let exchange = Arc::new(PaperExchange::new(cfg.paper.mid_price, cfg.paper.book_params()));
    let shutdown = CancellationToken::new();

    let walker = if cfg.paper.mid_step > Decimal::ZERO {
        Some(tokio::spawn(walk_mid(
            exchange.clone(),
            cfg.clone(),
            shutdown.clone(),
        )))
    } else {
        None
    };

    match cfg.engine.mode {
        RunMode::Loop => run_free_loop(&cfg, exchange.clone(), shutdown.clone()).await?,
        RunMode::Service => run_service(&cfg, exchange.clone(), shutdown.clone()).await?,
    }

    shutdown.cancel();
    if let Some(walker) = walker {
        let _ = walker.await;
    }

    let fills = exchange.fills().await.len();
    let resting = exchange.resting().await.len();
    info!(fills, resting, "GRIDKEEPER shut down cleanly.");
    Ok(())
}

/// Free-running mode: cycle on the interval until Ctrl+C.
async fn run_free_loop(
    cfg: &config::AppConfig,
    gateway: Arc<dyn ExchangeGateway>,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut driver = ReconciliationDriver::new(
        gateway,
        cfg.engine.account.clone(),
        cfg.engine.instrument.clone(),
        cfg.grid.clone(),
        cfg.engine.strategy,
    )?;
    let geometry = driver
        .check_geometry()
        .await
        .context("Grid does not fit the exchange's book params")?;
    info!(
        levels = geometry.levels().len(),
        order_size = %geometry.order_size(),
        "Grid geometry accepted"
    );

    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));
    info!("Entering main loop. Press Ctrl+C to stop.");

    let mut failures = 0u64;
    let cycles = run_loop(&mut driver, cfg.engine.interval(), shutdown, |summary| {
        log_failure_streak(summary, &mut failures);
    })
    .await;

    info!(cycles, "Grid loop finished");
    Ok(())
}

/// Service mode: start the supervised engine and serve the control API.
async fn run_service(
    cfg: &config::AppConfig,
    gateway: Arc<dyn ExchangeGateway>,
    shutdown: CancellationToken,
) -> Result<()> {
    let service = GridService::new(
        gateway,
        cfg.engine.account.clone(),
        cfg.engine.instrument.clone(),
    );

    let server = if cfg.dashboard.enabled {
        Some(dashboard::spawn_dashboard(service.clone(), cfg.dashboard.port).await?)
    } else {
        warn!("Control API disabled; stop the engine with Ctrl+C");
        None
    };

    service
        .start(cfg.grid.clone(), cfg.engine.strategy, cfg.engine.interval())
        .await
        .context("Failed to start grid engine")?;

    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));
    info!("Engine running. Press Ctrl+C to stop.");
    shutdown.cancelled().await;

    service.stop().await;
    if let Some(server) = server {
        server.abort();
    }
    Ok(())
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received."),
        Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
    }
    shutdown.cancel();
}

fn log_failure_streak(summary: &CycleSummary, failures: &mut u64) {
    if summary.is_failure() {
        *failures += 1;
        if *failures % 5 == 0 {
            warn!(consecutive = *failures, "Grid cycles keep failing");
        }
    } else {
        *failures = 0;
    }
}

/// Walk the paper mid back and forth across the grid so fills happen.
async fn walk_mid(exchange: Arc<PaperExchange>, cfg: config::AppConfig, shutdown: CancellationToken) {
    let step = cfg.paper.mid_step;
    let (low, high) = (cfg.grid.min, cfg.grid.max);
    let mut mid = cfg.paper.mid_price;
    let mut rising = true;

    let mut ticker = tokio::time::interval(Duration::from_millis(cfg.engine.interval_ms.max(1_000)));
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                if rising && mid + step > high {
                    rising = false;
                } else if !rising && mid - step < low {
                    rising = true;
                }
                mid = if rising { mid + step } else { mid - step };

                match exchange.set_mid(mid).await {
                    Ok(fills) if !fills.is_empty() => {
                        info!(mid = %mid, filled = fills.len(), "Paper mid moved");
                    }
                    Ok(_) => {}
                    Err(e) => error!(error = %e, "Failed to move paper mid"),
                }
            }
        }
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("gridkeeper=info"));

    let json_logging = std::env::var("GRIDKEEPER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
