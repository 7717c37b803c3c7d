//! Bar-stream quality gate.
//!
//! The acquisition collaborator guarantees ordered, deduplicated bars; this
//! gate rejects any violation as a data-quality error for the affected
//! instrument instead of silently repairing it. Other instruments in a
//! multi-instrument run are unaffected.

use crate::domain::Bar;
use chrono::NaiveDateTime;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataQualityError {
    #[error("bars out of order at index {index}: {prev} then {next}")]
    OutOfOrder {
        index: usize,
        prev: NaiveDateTime,
        next: NaiveDateTime,
    },
    #[error("duplicate bar timestamp at index {index}: {timestamp}")]
    Duplicate {
        index: usize,
        timestamp: NaiveDateTime,
    },
    #[error("non-finite price or volume at index {index}")]
    NonFinite { index: usize },
    #[error("invalid OHLCV values at index {index} (non-positive price, inverted range, or negative volume)")]
    Insane { index: usize },
    #[error("bar at index {index} belongs to instrument '{found}', expected '{expected}'")]
    MixedInstrument {
        index: usize,
        expected: String,
        found: String,
    },
}

/// Check a single-instrument, single-timeframe bar sequence.
pub fn check_bars(bars: &[Bar]) -> Result<(), DataQualityError> {
    let Some(first) = bars.first() else {
        return Ok(());
    };

    for (index, bar) in bars.iter().enumerate() {
        if bar.instrument != first.instrument || bar.timeframe != first.timeframe {
            return Err(DataQualityError::MixedInstrument {
                index,
                expected: first.instrument.clone(),
                found: bar.instrument.clone(),
            });
        }
        if bar.has_non_finite() {
            return Err(DataQualityError::NonFinite { index });
        }
        if !bar.is_sane() {
            return Err(DataQualityError::Insane { index });
        }
        if index > 0 {
            let prev = &bars[index - 1];
            if bar.timestamp == prev.timestamp {
                return Err(DataQualityError::Duplicate {
                    index,
                    timestamp: bar.timestamp,
                });
            }
            if bar.timestamp < prev.timestamp {
                return Err(DataQualityError::OutOfOrder {
                    index,
                    prev: prev.timestamp,
                    next: bar.timestamp,
                });
            }
        }
    }
    Ok(())
}
