//! Typed buy/sell signals emitted by the classifier.

use super::position::PositionSide;
use super::timeframe::Timeframe;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal direction, independent of tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSide {
    Buy,
    Sell,
}

impl SignalSide {
    pub fn opposite(&self) -> SignalSide {
        match self {
            SignalSide::Buy => SignalSide::Sell,
            SignalSide::Sell => SignalSide::Buy,
        }
    }

    pub fn position_side(&self) -> PositionSide {
        match self {
            SignalSide::Buy => PositionSide::Long,
            SignalSide::Sell => PositionSide::Short,
        }
    }
}

/// Three-tier classification:
/// - Tier 1: directional stroke completes and reverses
/// - Tier 2: close breaks out of a closed pivot bound
/// - Tier 3: tier 1/2 conditions resonate across ≥2 timeframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Buy1,
    Buy2,
    Buy3,
    Sell1,
    Sell2,
    Sell3,
}

impl SignalKind {
    pub fn side(&self) -> SignalSide {
        match self {
            SignalKind::Buy1 | SignalKind::Buy2 | SignalKind::Buy3 => SignalSide::Buy,
            SignalKind::Sell1 | SignalKind::Sell2 | SignalKind::Sell3 => SignalSide::Sell,
        }
    }

    pub fn tier(&self) -> u8 {
        match self {
            SignalKind::Buy1 | SignalKind::Sell1 => 1,
            SignalKind::Buy2 | SignalKind::Sell2 => 2,
            SignalKind::Buy3 | SignalKind::Sell3 => 3,
        }
    }

    /// Resonance kind for a given side (tier 3).
    pub fn resonance(side: SignalSide) -> SignalKind {
        match side {
            SignalSide::Buy => SignalKind::Buy3,
            SignalSide::Sell => SignalKind::Sell3,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalKind::Buy1 => "buy1",
            SignalKind::Buy2 => "buy2",
            SignalKind::Buy3 => "buy3",
            SignalKind::Sell1 => "sell1",
            SignalKind::Sell2 => "sell2",
            SignalKind::Sell3 => "sell3",
        };
        write!(f, "{s}")
    }
}

/// A classified trading signal. Confidence is in [0, 1] and monotonic across
/// tiers: a tier-3 signal never scores below its contributing tier-1/2 inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub instrument: String,
    pub timeframe: Timeframe,
    pub kind: SignalKind,
    /// Trigger price: the reversal fractal's extreme (tier 1), the breaking
    /// bar's high/low (tier 2), or the strongest contributor's trigger (tier 3).
    pub price: f64,
    pub timestamp: NaiveDateTime,
    pub confidence: f64,
}
