//! ChanLab Core — Chan/Wave-Pivot pattern pipeline and backtest engine.
//!
//! This crate contains the heart of the signal system:
//! - Domain types (bars, fractals, strokes, pivots, signals, positions, trades)
//! - Pattern pipeline: fractal detection → stroke assembly → pivot detection
//! - Three-tier signal classifier with multi-timeframe resonance
//! - Fractional-Kelly risk manager with hard loss caps
//! - Single-pass backtest replay with a trade ledger
//!
//! The crate does no I/O. Bars arrive already ordered and deduplicated per
//! (instrument, timeframe); any violation is rejected at the pipeline boundary
//! as a data-quality error.

pub mod config;
pub mod domain;
pub mod engine;
pub mod pipeline;
pub mod risk;
pub mod validate;

pub use config::{ChanConfig, ConfigError, FractalTiePolicy};
pub use validate::DataQualityError;
