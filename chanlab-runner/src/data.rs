//! Bar loading, resampling, and synthetic data.

use chanlab_core::domain::{Bar, Timeframe};
use chrono::{NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("csv error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
    #[error("bad timestamp '{value}' in {path}")]
    Timestamp { path: PathBuf, value: String },
    #[error("{path} contains no bars")]
    Empty { path: PathBuf },
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: f64,
}

/// Load one instrument's bars at one timeframe from
/// `{dir}/{instrument}_{timeframe}.csv`.
///
/// Expected columns: `datetime,open,high,low,close,volume` with timestamps
/// formatted `YYYY-MM-DD HH:MM:SS`.
pub fn load_csv(
    dir: &Path,
    instrument: &str,
    timeframe: Timeframe,
) -> Result<Vec<Bar>, LoadError> {
    let path = dir.join(format!("{instrument}_{timeframe}.csv"));
    let mut reader = csv::Reader::from_path(&path).map_err(|source| {
        if source.is_io_error() {
            LoadError::Io {
                path: path.clone(),
                source: std::io::Error::other(source.to_string()),
            }
        } else {
            LoadError::Csv {
                path: path.clone(),
                source,
            }
        }
    })?;

    let mut bars = Vec::new();
    for record in reader.deserialize::<CsvBar>() {
        let record = record.map_err(|source| LoadError::Csv {
            path: path.clone(),
            source,
        })?;
        let timestamp = NaiveDateTime::parse_from_str(&record.datetime, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| LoadError::Timestamp {
                path: path.clone(),
                value: record.datetime.clone(),
            })?;
        bars.push(Bar {
            instrument: instrument.to_string(),
            timeframe,
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    if bars.is_empty() {
        return Err(LoadError::Empty { path });
    }
    Ok(bars)
}

/// Aggregate fine-grained bars into a coarser timeframe.
///
/// Buckets are aligned on wall-clock multiples of the target timeframe.
/// Partial buckets at the tail are kept; the pipeline's confirmation tags
/// already treat the data edge as provisional.
pub fn resample(bars: &[Bar], target: Timeframe) -> Vec<Bar> {
    let mut out: Vec<Bar> = Vec::new();
    let minutes = target.minutes();
    for bar in bars {
        let since_epoch = bar.timestamp.and_utc().timestamp() / 60;
        let bucket = bar.timestamp - chrono::Duration::minutes(since_epoch.rem_euclid(minutes));
        match out.last_mut() {
            Some(last) if last.timestamp == bucket => {
                last.high = last.high.max(bar.high);
                last.low = last.low.min(bar.low);
                last.close = bar.close;
                last.volume += bar.volume;
            }
            _ => out.push(Bar {
                instrument: bar.instrument.clone(),
                timeframe: target,
                timestamp: bucket,
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            }),
        }
    }
    out
}

/// Deterministic synthetic walk with slow trend cycles, so the pipeline has
/// reversals and consolidations to find. Same seed, same bars.
pub fn synthetic_walk(
    instrument: &str,
    timeframe: Timeframe,
    n: usize,
    seed: u64,
) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed ^ hash_instrument(instrument));
    let base = session_open();
    let mut price = 100.0f64;
    let cycle = 40.0f64;

    (0..n)
        .map(|i| {
            let phase = (i as f64) * std::f64::consts::TAU / cycle;
            let drift = phase.sin() * 0.004;
            let noise: f64 = rng.gen_range(-0.003..0.003);
            let open = price;
            price = (price * (1.0 + drift + noise)).max(1.0);
            let close = price;
            let span = open.max(close) * rng.gen_range(0.0..0.002);
            Bar {
                instrument: instrument.to_string(),
                timeframe,
                timestamp: base + chrono::Duration::minutes(timeframe.minutes() * i as i64),
                open,
                high: open.max(close) + span,
                low: (open.min(close) - span).max(0.01),
                close,
                volume: rng.gen_range(1_000.0..100_000.0),
            }
        })
        .collect()
}

/// A clean falling-then-rising sequence. Handy for smoke-testing the
/// reversal path without a full random walk.
pub fn synthetic_v_shape(
    instrument: &str,
    timeframe: Timeframe,
    half: usize,
    start: f64,
    step: f64,
) -> Vec<Bar> {
    let base = session_open();
    let mut price = start;
    let mut bars = Vec::with_capacity(half * 2);
    for i in 0..half * 2 {
        let falling = i < half;
        let close = if falling { price - 0.2 } else { price + 0.2 };
        bars.push(Bar {
            instrument: instrument.to_string(),
            timeframe,
            timestamp: base + chrono::Duration::minutes(timeframe.minutes() * i as i64),
            open: price,
            high: price + 0.3,
            low: (price - 0.3).max(0.01),
            close,
            volume: 10_000.0,
        });
        price += if falling { -step } else { step };
    }
    bars
}

/// Identical bars: no fractal, no stroke, no signal.
pub fn synthetic_flat(instrument: &str, timeframe: Timeframe, n: usize, price: f64) -> Vec<Bar> {
    let base = session_open();
    (0..n)
        .map(|i| Bar {
            instrument: instrument.to_string(),
            timeframe,
            timestamp: base + chrono::Duration::minutes(timeframe.minutes() * i as i64),
            open: price,
            high: price + 0.5,
            low: (price - 0.5).max(0.01),
            close: price,
            volume: 10_000.0,
        })
        .collect()
}

fn session_open() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 5)
        .unwrap_or_default()
        .and_hms_opt(9, 30, 0)
        .unwrap_or_default()
}

fn hash_instrument(instrument: &str) -> u64 {
    let digest = blake3::hash(instrument.as_bytes());
    u64::from_le_bytes(
        digest.as_bytes()[..8]
            .try_into()
            .unwrap_or([0u8; 8]),
    )
}
