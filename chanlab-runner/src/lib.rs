//! ChanLab Runner — batch orchestration around the core pipeline.
//!
//! Responsibilities:
//! - Run configuration (TOML) with a content-addressed run id
//! - Bar loading from CSV, resampling, and synthetic data generation
//! - Parallel fan-out across instruments with cooperative cancellation
//! - Performance metrics over ledgers and equity curves
//! - Report artifacts: JSON summaries and CSV trade/signal tables

pub mod config;
pub mod data;
pub mod metrics;
pub mod report;
pub mod runner;

pub use config::{RunConfig, RunId};
pub use runner::{run_batch, CancellationToken, InstrumentResult, RunSummary};
