//! Report artifacts: JSON summary plus CSV trade and signal tables.
//!
//! Artifacts land under `{out_dir}/{run_id}/`. Identical configs share a
//! run id, so re-running overwrites in place instead of accumulating copies.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::runner::RunSummary;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write csv {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}

/// Flat row for the trades table.
#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    instrument: &'a str,
    side: String,
    entry_kind: String,
    entry_timestamp: String,
    entry_price: f64,
    exit_timestamp: String,
    exit_price: f64,
    exit_reason: String,
    size_frac: f64,
    pnl: f64,
}

/// Flat row for the signals table.
#[derive(Debug, Serialize)]
struct SignalRow<'a> {
    instrument: &'a str,
    timeframe: String,
    kind: String,
    timestamp: String,
    price: f64,
    confidence: f64,
}

/// Write all artifacts for a finished batch. Returns the artifact directory.
pub fn write_artifacts(summary: &RunSummary, out_dir: &Path) -> Result<PathBuf, ReportError> {
    let dir = out_dir.join(&summary.run_id);
    fs::create_dir_all(&dir).map_err(|source| ReportError::Io {
        path: dir.clone(),
        source,
    })?;

    write_summary_json(summary, &dir.join("summary.json"))?;
    write_trades_csv(summary, &dir.join("trades.csv"))?;
    write_signals_csv(summary, &dir.join("signals.csv"))?;

    info!(dir = %dir.display(), "artifacts written");
    Ok(dir)
}

fn write_summary_json(summary: &RunSummary, path: &Path) -> Result<(), ReportError> {
    let json = serde_json::to_vec_pretty(summary).map_err(|source| ReportError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_trades_csv(summary: &RunSummary, path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    for result in &summary.completed {
        for trade in &result.outcome.ledger.trades {
            let row = TradeRow {
                instrument: &trade.instrument,
                side: format!("{:?}", trade.side).to_lowercase(),
                entry_kind: trade.entry_kind.to_string(),
                entry_timestamp: trade.entry_timestamp.to_string(),
                entry_price: trade.entry_price,
                exit_timestamp: trade.exit_timestamp.to_string(),
                exit_price: trade.exit_price,
                exit_reason: format!("{:?}", trade.exit_reason),
                size_frac: trade.size_frac,
                pnl: trade.pnl,
            };
            writer.serialize(row).map_err(|source| ReportError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_signals_csv(summary: &RunSummary, path: &Path) -> Result<(), ReportError> {
    let mut writer = csv::Writer::from_path(path).map_err(|source| ReportError::Csv {
        path: path.to_path_buf(),
        source,
    })?;
    for result in &summary.completed {
        for signal in &result.signals {
            let row = SignalRow {
                instrument: &signal.instrument,
                timeframe: signal.timeframe.to_string(),
                kind: signal.kind.to_string(),
                timestamp: signal.timestamp.to_string(),
                price: signal.price,
                confidence: signal.confidence,
            };
            writer.serialize(row).map_err(|source| ReportError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    writer.flush().map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
