//! Batch runner — fans the pipeline out across the instrument universe.
//!
//! Instruments are independent, so the fan-out is a rayon parallel map with
//! no shared mutable state. One instrument failing is recorded by name and
//! never aborts the rest of the batch. Cancellation is cooperative and
//! checked at the instrument boundary: work already in flight finishes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use chanlab_core::domain::{Bar, Signal, Timeframe};
use chanlab_core::engine::{BacktestEngine, BacktestOutcome};
use chanlab_core::pipeline::{analyze_timeframe, detect_resonance, TimeframeSnapshot};
use chanlab_core::DataQualityError;

use crate::config::{ConfigError, DataSource, RunConfig, RunId};
use crate::data::{self, LoadError};
use crate::metrics::PerformanceMetrics;

/// Why one instrument's run failed. The batch itself keeps going.
#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("data load failed: {0}")]
    Load(#[from] LoadError),
    #[error("data quality check failed: {0}")]
    Quality(#[from] DataQualityError),
    #[error("no bars at primary timeframe {0}")]
    NoPrimaryBars(Timeframe),
}

/// Cooperative cancellation flag, shared between the batch and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Everything produced for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentResult {
    pub instrument: String,
    /// All signals fed to the replay, resonance included.
    pub signals: Vec<Signal>,
    pub outcome: BacktestOutcome,
    pub metrics: PerformanceMetrics,
}

/// A failed instrument, by name, with the rendered error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedInstrument {
    pub instrument: String,
    pub error: String,
}

/// Batch outcome: completed results plus named failures and the instruments
/// skipped by cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub completed: Vec<InstrumentResult>,
    pub failed: Vec<FailedInstrument>,
    pub cancelled: Vec<String>,
}

enum Slot {
    Done(InstrumentResult),
    Failed(FailedInstrument),
    Cancelled(String),
}

/// Run the whole universe. Fails fast only on an invalid configuration;
/// per-instrument errors land in the summary.
pub fn run_batch(config: &RunConfig, token: &CancellationToken) -> Result<RunSummary, ConfigError> {
    config.validate()?;
    let run_id = config.run_id();
    info!(run_id = %run_id, instruments = config.universe.len(), "starting batch");

    // A scoped pool honors the configured width without touching the global
    // rayon pool other callers may share.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers)
        .build()
        .map_err(|e| ConfigError::Workers(e.to_string()))?;

    let slots: Vec<Slot> = pool.install(|| fan_out(config, token));

    let mut summary = RunSummary {
        run_id,
        completed: Vec::new(),
        failed: Vec::new(),
        cancelled: Vec::new(),
    };
    for slot in slots {
        match slot {
            Slot::Done(r) => summary.completed.push(r),
            Slot::Failed(f) => summary.failed.push(f),
            Slot::Cancelled(name) => summary.cancelled.push(name),
        }
    }
    Ok(summary)
}

fn fan_out(config: &RunConfig, token: &CancellationToken) -> Vec<Slot> {
    config
        .universe
        .par_iter()
        .map(|instrument| {
            if token.is_cancelled() {
                return Slot::Cancelled(instrument.clone());
            }
            match run_instrument(config, instrument) {
                Ok(result) => {
                    info!(
                        instrument = %instrument,
                        trades = result.outcome.ledger.trades.len(),
                        signals = result.signals.len(),
                        "instrument complete"
                    );
                    Slot::Done(result)
                }
                Err(error) => {
                    warn!(instrument = %instrument, %error, "instrument failed");
                    Slot::Failed(FailedInstrument {
                        instrument: instrument.clone(),
                        error: error.to_string(),
                    })
                }
            }
        })
        .collect()
}

/// One instrument end to end: bars → snapshots → resonance → replay → stats.
fn run_instrument(
    config: &RunConfig,
    instrument: &str,
) -> Result<InstrumentResult, InstrumentError> {
    let bars_by_tf = load_universe_bars(config, instrument)?;

    let mut snapshots: BTreeMap<Timeframe, TimeframeSnapshot> = BTreeMap::new();
    for (tf, bars) in &bars_by_tf {
        let snapshot = analyze_timeframe(instrument, *tf, bars, &config.chan)?;
        snapshots.insert(*tf, snapshot);
    }

    let primary = snapshots
        .get(&config.primary_timeframe)
        .ok_or(InstrumentError::NoPrimaryBars(config.primary_timeframe))?;

    let mut signals = primary.signals.clone();
    signals.extend(detect_resonance(&snapshots, &config.chan));
    signals.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(b.kind.tier().cmp(&a.kind.tier()))
    });

    let primary_bars = bars_by_tf
        .get(&config.primary_timeframe)
        .ok_or(InstrumentError::NoPrimaryBars(config.primary_timeframe))?;
    let engine = BacktestEngine::new(&config.chan);
    let outcome = engine.run(instrument, primary_bars, &signals, config.initial_equity)?;
    let metrics = PerformanceMetrics::compute(
        &outcome.equity_curve,
        &outcome.ledger.trades,
        config.initial_equity,
    );

    Ok(InstrumentResult {
        instrument: instrument.to_string(),
        signals,
        outcome,
        metrics,
    })
}

/// Bars for every analysis timeframe.
///
/// CSV sources carry one file per timeframe. Synthetic data is generated once
/// at the finest analysis timeframe and resampled upward, so the timeframes
/// describe the same underlying walk.
fn load_universe_bars(
    config: &RunConfig,
    instrument: &str,
) -> Result<BTreeMap<Timeframe, Vec<Bar>>, InstrumentError> {
    let mut out = BTreeMap::new();
    match &config.data {
        DataSource::Csv { dir } => {
            for tf in &config.analysis_timeframes {
                out.insert(*tf, data::load_csv(dir, instrument, *tf)?);
            }
        }
        DataSource::Synthetic { bars, seed } => {
            let finest = config
                .analysis_timeframes
                .iter()
                .copied()
                .min()
                .unwrap_or(config.primary_timeframe);
            let base = data::synthetic_walk(instrument, finest, *bars, *seed);
            for tf in &config.analysis_timeframes {
                if *tf == finest {
                    out.insert(*tf, base.clone());
                } else {
                    out.insert(*tf, data::resample(&base, *tf));
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_config() -> RunConfig {
        RunConfig {
            universe: vec!["sh600519".into(), "sz000001".into()],
            data: DataSource::Synthetic {
                bars: 400,
                seed: 42,
            },
            ..Default::default()
        }
    }

    #[test]
    fn batch_completes_all_instruments() {
        let config = synthetic_config();
        let summary = run_batch(&config, &CancellationToken::new()).unwrap();
        assert_eq!(summary.completed.len(), 2);
        assert!(summary.failed.is_empty());
        assert!(summary.cancelled.is_empty());
        for result in &summary.completed {
            assert_eq!(
                result.outcome.equity_curve.len(),
                400,
                "one equity point per primary bar"
            );
        }
    }

    #[test]
    fn batch_is_deterministic() {
        let config = synthetic_config();
        let token = CancellationToken::new();
        let a = run_batch(&config, &token).unwrap();
        let b = run_batch(&config, &token).unwrap();
        assert_eq!(a.run_id, b.run_id);
        // Parallel order may differ; compare per instrument.
        for result in &a.completed {
            let twin = b
                .completed
                .iter()
                .find(|r| r.instrument == result.instrument)
                .unwrap();
            assert_eq!(result, twin);
        }
    }

    #[test]
    fn cancelled_batch_skips_everything() {
        let config = synthetic_config();
        let token = CancellationToken::new();
        token.cancel();
        let summary = run_batch(&config, &token).unwrap();
        assert!(summary.completed.is_empty());
        assert_eq!(summary.cancelled.len(), 2);
    }

    #[test]
    fn missing_csv_fails_by_name_without_aborting_batch() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunConfig {
            universe: vec!["ghost".into()],
            data: DataSource::Csv {
                dir: dir.path().to_path_buf(),
            },
            ..Default::default()
        };
        let summary = run_batch(&config, &CancellationToken::new()).unwrap();
        assert!(summary.completed.is_empty());
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].instrument, "ghost");
    }

    #[test]
    fn invalid_config_rejected_before_any_work() {
        let config = RunConfig {
            universe: vec![],
            ..Default::default()
        };
        assert!(run_batch(&config, &CancellationToken::new()).is_err());
    }
}
