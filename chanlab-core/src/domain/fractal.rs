//! Fractal — a local price extremum (3-bar turning point).

use super::timeframe::Timeframe;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Top: middle high strictly above both neighbors. Bottom: symmetric on lows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FractalKind {
    Top,
    Bottom,
}

impl FractalKind {
    pub fn opposite(&self) -> FractalKind {
        match self {
            FractalKind::Top => FractalKind::Bottom,
            FractalKind::Bottom => FractalKind::Top,
        }
    }
}

/// Tail-sensitivity tag for derived entities (fractals, strokes, pivots).
///
/// Entities near the live edge of the data are Provisional; a later bar
/// arrival produces a new Confirmed value instead of rewriting history, which
/// keeps the pipeline idempotent over an unchanged bar sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
    Confirmed,
    Provisional,
}

/// A turning point in a bar sequence. Never mutated once finalized; the
/// detector recomputes fractals whenever new bars arrive at the tail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fractal {
    pub timeframe: Timeframe,
    /// Index of the middle bar in the source sequence.
    pub index: usize,
    pub timestamp: NaiveDateTime,
    pub kind: FractalKind,
    /// The extreme price: the middle bar's high (Top) or low (Bottom).
    pub price: f64,
    pub confirmation: Confirmation,
}

impl Fractal {
    pub fn is_confirmed(&self) -> bool {
        self.confirmation == Confirmation::Confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_opposite() {
        assert_eq!(FractalKind::Top.opposite(), FractalKind::Bottom);
        assert_eq!(FractalKind::Bottom.opposite(), FractalKind::Top);
    }
}
