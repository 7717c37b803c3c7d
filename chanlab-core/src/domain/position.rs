//! Position — an open exposure created from an accepted signal.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn opposite(&self) -> PositionSide {
        match self {
            PositionSide::Long => PositionSide::Short,
            PositionSide::Short => PositionSide::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Opened only in response to a signal accepted by the risk manager; closed
/// when price crosses the stop-loss or take-profit level, or an opposing
/// signal of sufficient tier arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub instrument: String,
    pub side: PositionSide,
    pub entry_price: f64,
    /// Position size as a fraction of equity at entry.
    pub size_frac: f64,
    /// Notional value committed at entry (size_frac × equity at entry).
    pub notional: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub open_timestamp: NaiveDateTime,
    /// Tier of the signal that opened the position.
    pub entry_tier: u8,
    pub status: PositionStatus,
}

impl Position {
    /// Unrealized P&L at `price`, in cash terms.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        let move_frac = (price - self.entry_price) / self.entry_price;
        match self.side {
            PositionSide::Long => self.notional * move_frac,
            PositionSide::Short => -self.notional * move_frac,
        }
    }
}
