//! Bar — the fundamental market data unit.

use super::timeframe::Timeframe;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLCV bar for one instrument at one timeframe.
///
/// Immutable once stored. Within an (instrument, timeframe) sequence bars are
/// ordered by timestamp and unique per timestamp; the quality gate in
/// `validate` rejects violations instead of repairing them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub instrument: String,
    pub timeframe: Timeframe,
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLCV field is non-finite.
    pub fn has_non_finite(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLCV sanity check: positive prices, high/low envelope holds,
    /// non-negative volume.
    pub fn is_sane(&self) -> bool {
        if self.has_non_finite() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
            && self.volume >= 0.0
    }

    /// High-low range of the bar.
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// True if this bar's [low, high] intersects `[lo, hi]` within `epsilon`.
    pub fn overlaps(&self, lo: f64, hi: f64, epsilon: f64) -> bool {
        self.low <= hi + epsilon && self.high >= lo - epsilon
    }
}
