//! Performance metrics — pure functions over equity curves and trade lists.
//!
//! Ratios that need a minimum sample are `Option<f64>`: `None` means
//! "insufficient data", never a silent zero or NaN.

use chanlab_core::domain::TradeRecord;
use chanlab_core::engine::EquityPoint;
use serde::{Deserialize, Serialize};

/// Aggregate statistics for one instrument's replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub trade_count: usize,
    pub total_return: f64,
    pub max_drawdown: f64,
    /// None with no trades.
    pub win_rate: Option<f64>,
    /// None when there are no losing trades to divide by.
    pub profit_factor: Option<f64>,
    /// None with fewer than 2 trades or zero variance.
    pub sharpe: Option<f64>,
    /// None with no trades.
    pub avg_trade_pnl: Option<f64>,
}

impl PerformanceMetrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[TradeRecord],
        initial_equity: f64,
    ) -> Self {
        let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        Self {
            trade_count: trades.len(),
            total_return: total_return(&equity, initial_equity),
            max_drawdown: max_drawdown(&equity),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            sharpe: sharpe_ratio(trades),
            avg_trade_pnl: avg_trade_pnl(trades),
        }
    }
}

/// Total return as a fraction of initial equity.
pub fn total_return(equity: &[f64], initial_equity: f64) -> f64 {
    match equity.last() {
        Some(last) if initial_equity > 0.0 => (last - initial_equity) / initial_equity,
        _ => 0.0,
    }
}

/// Maximum peak-to-trough drawdown as a non-negative fraction.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0f64;
    for &point in equity {
        peak = peak.max(point);
        if peak > 0.0 {
            worst = worst.max((peak - point) / peak);
        }
    }
    worst
}

/// Fraction of trades with positive P&L.
pub fn win_rate(trades: &[TradeRecord]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    Some(winners as f64 / trades.len() as f64)
}

/// Gross profit over gross loss. None when no trade lost money.
pub fn profit_factor(trades: &[TradeRecord]) -> Option<f64> {
    let gross_profit: f64 = trades.iter().map(|t| t.pnl.max(0.0)).sum();
    let gross_loss: f64 = trades.iter().map(|t| (-t.pnl).max(0.0)).sum();
    if gross_loss <= 0.0 {
        return None;
    }
    Some(gross_profit / gross_loss)
}

/// Sharpe-like ratio over per-trade returns: mean over standard deviation,
/// scaled by the square root of the trade count. None with fewer than 2
/// trades or zero variance.
pub fn sharpe_ratio(trades: &[TradeRecord]) -> Option<f64> {
    if trades.len() < 2 {
        return None;
    }
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct()).collect();
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std = var.sqrt();
    if std < 1e-15 {
        return None;
    }
    Some(mean / std * (returns.len() as f64).sqrt())
}

pub fn avg_trade_pnl(trades: &[TradeRecord]) -> Option<f64> {
    if trades.is_empty() {
        return None;
    }
    Some(trades.iter().map(|t| t.pnl).sum::<f64>() / trades.len() as f64)
}
