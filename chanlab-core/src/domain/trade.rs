//! TradeRecord — immutable snapshot of a closed position.

use super::position::PositionSide;
use super::signal::SignalKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    OpposingSignal,
    EndOfData,
}

/// A complete round-trip trade: entry → exit plus realized P&L.
/// Appended to the backtest ledger, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub instrument: String,
    pub side: PositionSide,
    pub entry_kind: SignalKind,

    pub entry_timestamp: NaiveDateTime,
    pub entry_price: f64,

    pub exit_timestamp: NaiveDateTime,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    /// Size as a fraction of equity at entry.
    pub size_frac: f64,
    /// Notional committed at entry.
    pub notional: f64,
    /// Realized P&L in cash terms.
    pub pnl: f64,
}

impl TradeRecord {
    /// Return on the committed notional.
    pub fn return_pct(&self) -> f64 {
        if self.notional <= 0.0 {
            return 0.0;
        }
        self.pnl / self.notional
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
