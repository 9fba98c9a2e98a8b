//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. The
//! grid section is checked with the same rules `start()` applies, so a bad
//! file fails at boot rather than on the first cycle.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::types::{BookParams, GridConfig, Strategy};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: EngineConfig,
    pub grid: GridConfig,
    pub paper: PaperConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Which harness the binary drives.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Free-running loop until Ctrl+C.
    #[default]
    Loop,
    /// Supervised service behind the control API.
    Service,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    pub account: String,
    pub instrument: String,
    #[serde(default = "default_strategy")]
    pub strategy: Strategy,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub mode: RunMode,
}

impl EngineConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Paper exchange seed values.
#[derive(Debug, Deserialize, Clone)]
pub struct PaperConfig {
    pub mid_price: Decimal,
    pub tick_size: Decimal,
    pub lot_size: Decimal,
    pub min_size: Decimal,
    /// How far the simulated mid walks per interval. Zero holds it still.
    #[serde(default)]
    pub mid_step: Decimal,
}

impl PaperConfig {
    pub fn book_params(&self) -> BookParams {
        BookParams {
            tick_size: self.tick_size,
            lot_size: self.lot_size,
            min_size: self.min_size,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 8080,
        }
    }
}

fn default_strategy() -> Strategy {
    Strategy::Anchored
}

fn default_interval_ms() -> u64 {
    5_000
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Invalid config file: {path}"))
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Failed to parse TOML")?;
        config.grid.validate()?;
        Ok(config)
    }
}
