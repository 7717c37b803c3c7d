//! Single-pass backtest replay.
//!
//! Bars on the primary timeframe are replayed in order against the classified
//! signal stream. Each bar is processed in two phases: price-level exits for
//! the open position first, then this bar's signals (opposing-signal exits
//! and new entries). A position opened on a bar is therefore never closed on
//! the same bar by its own stop or target.
//!
//! Intrabar ambiguity resolves worst-case: when one bar's range crosses both
//! the stop and the target, the stop fills.

use crate::config::ChanConfig;
use crate::domain::{
    Bar, ExitReason, Position, PositionSide, PositionStatus, Signal, SignalKind, TradeRecord,
};
use crate::risk::{RejectReason, RiskManager, SizingDecision};
use crate::validate::{self, DataQualityError};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Realized-plus-unrealized equity marked at one bar's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// A signal the risk manager declined, kept for the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSignal {
    pub signal: Signal,
    pub reason: RejectReason,
}

/// Append-only record of everything the replay did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub trades: Vec<TradeRecord>,
    pub skipped: Vec<SkippedSignal>,
}

/// Result of replaying one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    pub instrument: String,
    pub initial_equity: f64,
    pub final_equity: f64,
    /// One point per replayed bar.
    pub equity_curve: Vec<EquityPoint>,
    pub ledger: Ledger,
}

pub struct BacktestEngine {
    config: ChanConfig,
    risk: RiskManager,
}

impl BacktestEngine {
    pub fn new(config: &ChanConfig) -> Self {
        Self {
            config: config.clone(),
            risk: RiskManager::new(config),
        }
    }

    /// Replay `bars` against `signals` starting from `initial_equity`.
    ///
    /// Signals are matched to bars by timestamp; a signal stamped between two
    /// bars fires on the first bar at or after its timestamp. A position still
    /// open when the data ends is closed at the last close.
    pub fn run(
        &self,
        instrument: &str,
        bars: &[Bar],
        signals: &[Signal],
        initial_equity: f64,
    ) -> Result<BacktestOutcome, DataQualityError> {
        validate::check_bars(bars)?;

        let mut ordered: Vec<&Signal> = signals.iter().collect();
        ordered.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(b.kind.tier().cmp(&a.kind.tier()))
        });

        let mut equity = initial_equity;
        // Open position paired with the kind of the signal that opened it.
        let mut open: Option<(Position, SignalKind)> = None;
        let mut ledger = Ledger::default();
        let mut equity_curve = Vec::with_capacity(bars.len());
        let mut next_signal = 0usize;

        for bar in bars {
            if let Some((position, entry_kind)) = open.take() {
                match price_level_exit(&position, bar) {
                    Some((exit_price, reason)) => {
                        equity += close_position(
                            &mut ledger,
                            position,
                            entry_kind,
                            exit_price,
                            bar.timestamp,
                            reason,
                        );
                    }
                    None => open = Some((position, entry_kind)),
                }
            }

            while next_signal < ordered.len() && ordered[next_signal].timestamp <= bar.timestamp {
                let signal = ordered[next_signal];
                next_signal += 1;

                if let Some((position, entry_kind)) = open.take() {
                    let opposes = signal.kind.side().position_side() == position.side.opposite();
                    if opposes && signal.kind.tier() >= self.config.min_exit_tier {
                        equity += close_position(
                            &mut ledger,
                            position,
                            entry_kind,
                            bar.close,
                            bar.timestamp,
                            ExitReason::OpposingSignal,
                        );
                        // The closing signal is consumed, not re-entered.
                        continue;
                    }
                    open = Some((position, entry_kind));
                }

                match self.risk.evaluate(signal, equity, open.as_ref().map(|(p, _)| p)) {
                    SizingDecision::Accepted(intent) => {
                        let position = Position {
                            instrument: instrument.to_string(),
                            side: intent.side,
                            entry_price: intent.entry_price,
                            size_frac: intent.size_frac,
                            notional: intent.notional,
                            stop_loss: intent.stop_loss,
                            take_profit: intent.take_profit,
                            open_timestamp: bar.timestamp,
                            entry_tier: signal.kind.tier(),
                            status: PositionStatus::Open,
                        };
                        open = Some((position, signal.kind));
                    }
                    SizingDecision::Rejected(reason) => {
                        ledger.skipped.push(SkippedSignal {
                            signal: signal.clone(),
                            reason,
                        });
                    }
                }
            }

            let marked = equity
                + open
                    .as_ref()
                    .map(|(p, _)| p.unrealized_pnl(bar.close))
                    .unwrap_or(0.0);
            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: marked,
            });
        }

        if let (Some((position, entry_kind)), Some(last)) = (open.take(), bars.last()) {
            equity += close_position(
                &mut ledger,
                position,
                entry_kind,
                last.close,
                last.timestamp,
                ExitReason::EndOfData,
            );
            if let Some(point) = equity_curve.last_mut() {
                point.equity = equity;
            }
        }

        Ok(BacktestOutcome {
            instrument: instrument.to_string(),
            initial_equity,
            final_equity: equity,
            equity_curve,
            ledger,
        })
    }
}

/// Check the bar's range against the open position's exit levels.
/// Worst case: the stop is tested before the target.
fn price_level_exit(position: &Position, bar: &Bar) -> Option<(f64, ExitReason)> {
    match position.side {
        PositionSide::Long => {
            if bar.low <= position.stop_loss {
                Some((position.stop_loss, ExitReason::StopLoss))
            } else if bar.high >= position.take_profit {
                Some((position.take_profit, ExitReason::TakeProfit))
            } else {
                None
            }
        }
        PositionSide::Short => {
            if bar.high >= position.stop_loss {
                Some((position.stop_loss, ExitReason::StopLoss))
            } else if bar.low <= position.take_profit {
                Some((position.take_profit, ExitReason::TakeProfit))
            } else {
                None
            }
        }
    }
}

/// Append the round trip to the ledger and return the realized P&L.
fn close_position(
    ledger: &mut Ledger,
    position: Position,
    entry_kind: SignalKind,
    exit_price: f64,
    exit_timestamp: NaiveDateTime,
    exit_reason: ExitReason,
) -> f64 {
    let pnl = position.unrealized_pnl(exit_price);
    ledger.trades.push(TradeRecord {
        instrument: position.instrument,
        side: position.side,
        entry_kind,
        entry_timestamp: position.open_timestamp,
        entry_price: position.entry_price,
        exit_timestamp,
        exit_price,
        exit_reason,
        size_frac: position.size_frac,
        notional: position.notional,
        pnl,
    });
    pnl
}
