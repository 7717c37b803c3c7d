//! Risk manager: fractional-Kelly sizing behind hard caps.
//!
//! Every accepted entry satisfies two invariants regardless of signal
//! confidence: `size_frac <= max_position_size`, and the worst-case loss at
//! the stop (`size_frac * stop_loss_pct`) never exceeds `max_loss_per_trade`.

use crate::config::ChanConfig;
use crate::domain::{Position, PositionSide, PositionStatus, Signal};
use serde::{Deserialize, Serialize};

/// Why a signal was not converted into an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Equity is zero or negative; no new risk is taken.
    NonPositiveEquity,
    /// A position on the same side is already open for this instrument.
    AlreadyOpen,
    /// A position on the opposite side is open; entries never flip an open
    /// position directly.
    ConflictingPosition,
    /// The Kelly edge at this confidence and reward ratio is not positive.
    NoEdge,
    /// The signal's trigger price is not a usable entry level.
    BadPrice,
}

/// A fully-specified order: entry, size and both exit levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderIntent {
    pub side: PositionSide,
    pub entry_price: f64,
    /// Fraction of current equity committed.
    pub size_frac: f64,
    /// Cash committed at entry.
    pub notional: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Outcome of evaluating one signal against current account state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SizingDecision {
    Accepted(OrderIntent),
    Rejected(RejectReason),
}

/// Stateless evaluator; account state is passed in per call so the same
/// manager can serve many instruments.
#[derive(Debug, Clone)]
pub struct RiskManager {
    max_loss_per_trade: f64,
    max_position_size: f64,
    stop_loss_pct: f64,
    risk_reward_ratio: f64,
    kelly_fraction: f64,
}

impl RiskManager {
    pub fn new(config: &ChanConfig) -> Self {
        Self {
            max_loss_per_trade: config.max_loss_per_trade,
            max_position_size: config.max_position_size,
            stop_loss_pct: config.stop_loss_pct,
            risk_reward_ratio: config.risk_reward_ratio,
            kelly_fraction: config.kelly_fraction,
        }
    }

    /// Evaluate a signal against current equity and the open position (if
    /// any) on the same instrument.
    pub fn evaluate(
        &self,
        signal: &Signal,
        equity: f64,
        open_position: Option<&Position>,
    ) -> SizingDecision {
        if equity <= 0.0 || !equity.is_finite() {
            return SizingDecision::Rejected(RejectReason::NonPositiveEquity);
        }
        if signal.price <= 0.0 || !signal.price.is_finite() {
            return SizingDecision::Rejected(RejectReason::BadPrice);
        }

        let side = signal.kind.side().position_side();
        if let Some(open) = open_position.filter(|p| p.status == PositionStatus::Open) {
            return if open.side == side {
                SizingDecision::Rejected(RejectReason::AlreadyOpen)
            } else {
                SizingDecision::Rejected(RejectReason::ConflictingPosition)
            };
        }

        let Some(size_frac) = self.position_size(signal.confidence) else {
            return SizingDecision::Rejected(RejectReason::NoEdge);
        };

        let entry = signal.price;
        let sl = self.stop_loss_pct;
        let tp = self.stop_loss_pct * self.risk_reward_ratio;
        let (stop_loss, take_profit) = match side {
            PositionSide::Long => (entry * (1.0 - sl), entry * (1.0 + tp)),
            PositionSide::Short => (entry * (1.0 + sl), entry * (1.0 - tp)),
        };

        SizingDecision::Accepted(OrderIntent {
            side,
            entry_price: entry,
            size_frac,
            notional: equity * size_frac,
            stop_loss,
            take_profit,
        })
    }

    /// Fractional Kelly with the payoff ratio equal to the configured
    /// reward:risk. Returns None when the edge is non-positive.
    fn position_size(&self, confidence: f64) -> Option<f64> {
        let p = confidence.clamp(0.0, 1.0);
        let edge = p - (1.0 - p) / self.risk_reward_ratio;
        if edge <= 0.0 {
            return None;
        }
        let kelly = self.kelly_fraction * edge;
        // The loss cap binds through the stop distance: losing stop_loss_pct
        // on size_frac of equity must stay within max_loss_per_trade.
        let loss_cap = self.max_loss_per_trade / self.stop_loss_pct;
        Some(kelly.min(self.max_position_size).min(loss_cap))
    }
}
