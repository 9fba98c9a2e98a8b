//! GRIDKEEPER — anchored grid reconciliation engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod grid;
pub mod planner;
pub mod gateway;
pub mod engine;
pub mod dashboard;
