//! Pivot (hub) — consolidation range of mutually overlapping bars.

use super::fractal::Confirmation;
use super::timeframe::Timeframe;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Trend classification derived from the closes surrounding the pivot,
/// not from the pivot bound itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotTrend {
    Rising,
    Falling,
    Flat,
}

/// Consolidation range over a run of bars whose [low, high] ranges mutually
/// overlap. The bound is the running intersection of per-bar ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pivot {
    pub timeframe: Timeframe,
    pub start_index: usize,
    pub end_index: usize,
    pub start_timestamp: NaiveDateTime,
    pub end_timestamp: NaiveDateTime,
    /// Lower bound of the intersection.
    pub low: f64,
    /// Upper bound of the intersection.
    pub high: f64,
    /// Report-only context: break classification keys on the break direction
    /// alone, not on the surrounding trend.
    pub trend: PivotTrend,
    /// Provisional while the run still extends at the live edge of data;
    /// Confirmed once an incoming bar fails to intersect and closes it.
    pub confirmation: Confirmation,
}

impl Pivot {
    pub fn center(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    pub fn height(&self) -> f64 {
        self.high - self.low
    }

    pub fn bar_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn is_closed(&self) -> bool {
        self.confirmation == Confirmation::Confirmed
    }
}
