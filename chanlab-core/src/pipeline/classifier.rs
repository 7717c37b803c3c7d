//! Per-timeframe signal classification (tiers 1 and 2).
//!
//! The classifier is a pure function of one instrument's bar window at one
//! timeframe: it owns no mutable cross-instrument state. Tier 3 resonance
//! across timeframes lives in `resonance`, which consumes the read-only
//! snapshots produced here.

use crate::config::ChanConfig;
use crate::domain::{Bar, Fractal, FractalKind, Pivot, Signal, SignalKind, Stroke, Timeframe};
use crate::pipeline::{fractal, pivot, stroke};
use crate::validate::{self, DataQualityError};
use serde::{Deserialize, Serialize};

/// Everything derived from one (instrument, timeframe) bar window.
///
/// Snapshots are committed per instrument after analysis completes; the
/// resonance pass reads them without locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeSnapshot {
    pub instrument: String,
    pub timeframe: Timeframe,
    pub bar_count: usize,
    pub fractals: Vec<Fractal>,
    pub strokes: Vec<Stroke>,
    pub pivots: Vec<Pivot>,
    /// Tier 1 and tier 2 signals, ordered by timestamp then tier.
    pub signals: Vec<Signal>,
}

/// Run the full single-timeframe pipeline over a validated bar window.
///
/// Fewer bars than `min_bars_for_signal` is not an error: the structural
/// entities are still derived but the signal set is empty.
pub fn analyze_timeframe(
    instrument: &str,
    timeframe: Timeframe,
    bars: &[Bar],
    config: &ChanConfig,
) -> Result<TimeframeSnapshot, DataQualityError> {
    validate::check_bars(bars)?;

    let fractals = fractal::detect_all(bars, config);
    let strokes = stroke::build(&fractals, config);
    let pivots = pivot::detect(bars, config);

    let mut signals = Vec::new();
    if bars.len() >= config.min_bars_for_signal {
        classify_stroke_reversals(instrument, timeframe, bars, &fractals, &strokes, config, &mut signals);
        classify_pivot_breaks(instrument, timeframe, bars, &pivots, &mut signals);
        signals.sort_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then(a.kind.tier().cmp(&b.kind.tier()))
        });
    }

    Ok(TimeframeSnapshot {
        instrument: instrument.to_string(),
        timeframe,
        bar_count: bars.len(),
        fractals,
        strokes,
        pivots,
        signals,
    })
}

/// Tier 1: a directional stroke completes — its terminating fractal is
/// confirmed as the reversal into the opposite direction. A Down stroke
/// ending on a confirmed Bottom yields Buy1 at that fractal; Up→Top yields
/// Sell1.
///
/// The leg from the start of the window to the first fractal has no starting
/// fractal of its own but is still a directional move; it counts as a stroke
/// when it meets the same bar-count and amplitude thresholds. Without this
/// a reversal at the very front of the history (a clean V) would be invisible.
fn classify_stroke_reversals(
    instrument: &str,
    timeframe: Timeframe,
    bars: &[Bar],
    fractals: &[Fractal],
    strokes: &[Stroke],
    config: &ChanConfig,
    out: &mut Vec<Signal>,
) {
    let anchor = strokes.first().map(|s| &s.start).or_else(|| fractals.first());
    if let Some(first) = anchor {
        if first.is_confirmed() && first.index >= config.stroke_min_bars {
            if let Some(amplitude) = leading_leg_amplitude(bars, first) {
                if amplitude >= config.stroke_min_amplitude {
                    out.push(reversal_signal(instrument, timeframe, first, amplitude, config));
                }
            }
        }
    }

    for stroke in strokes.iter().filter(|s| s.is_completed()) {
        out.push(reversal_signal(
            instrument,
            timeframe,
            &stroke.end,
            stroke.amplitude(),
            config,
        ));
    }
}

fn reversal_signal(
    instrument: &str,
    timeframe: Timeframe,
    fractal: &Fractal,
    amplitude: f64,
    config: &ChanConfig,
) -> Signal {
    let kind = match fractal.kind {
        // A confirmed Bottom terminates a down move: buy.
        FractalKind::Bottom => SignalKind::Buy1,
        FractalKind::Top => SignalKind::Sell1,
    };
    Signal {
        instrument: instrument.to_string(),
        timeframe,
        kind,
        price: fractal.price,
        timestamp: fractal.timestamp,
        confidence: tier1_confidence(amplitude, config),
    }
}

/// Amplitude of the move from the window start down (or up) to the first
/// fractal, as a fraction of the window-extreme price.
fn leading_leg_amplitude(bars: &[Bar], first: &Fractal) -> Option<f64> {
    let leg = &bars[..=first.index];
    match first.kind {
        FractalKind::Bottom => {
            let peak = leg.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
            (peak > 0.0).then(|| (peak - first.price) / peak)
        }
        FractalKind::Top => {
            let trough = leg.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
            (trough > 0.0).then(|| (first.price - trough) / trough)
        }
    }
}

/// Tier 2: the close crosses outside a closed pivot's bound. Only the first
/// break of each pivot fires; the trigger price is the breaking bar's extreme
/// in the break direction.
fn classify_pivot_breaks(
    instrument: &str,
    timeframe: Timeframe,
    bars: &[Bar],
    pivots: &[Pivot],
    out: &mut Vec<Signal>,
) {
    for pivot in pivots.iter().filter(|p| p.is_closed()) {
        for bar in &bars[pivot.end_index + 1..] {
            if bar.close > pivot.high {
                out.push(Signal {
                    instrument: instrument.to_string(),
                    timeframe,
                    kind: SignalKind::Buy2,
                    price: bar.high,
                    timestamp: bar.timestamp,
                    confidence: tier2_confidence(bar.close - pivot.high, pivot),
                });
                break;
            }
            if bar.close < pivot.low {
                out.push(Signal {
                    instrument: instrument.to_string(),
                    timeframe,
                    kind: SignalKind::Sell2,
                    price: bar.low,
                    timestamp: bar.timestamp,
                    confidence: tier2_confidence(pivot.low - bar.close, pivot),
                });
                break;
            }
        }
    }
}

/// Base confidence 0.50–0.65, scaled by the amplitude of the completed move
/// relative to three times the stroke noise floor.
fn tier1_confidence(amplitude: f64, config: &ChanConfig) -> f64 {
    let floor = 3.0 * config.stroke_min_amplitude;
    let scale = if floor > 0.0 {
        (amplitude / floor).clamp(0.0, 1.0)
    } else {
        1.0
    };
    0.50 + 0.15 * scale
}

/// Base confidence 0.60–0.75, scaled by the break overshoot relative to the
/// pivot height.
fn tier2_confidence(overshoot: f64, pivot: &Pivot) -> f64 {
    let height = pivot.height();
    let scale = if height > 0.0 {
        (overshoot / height).clamp(0.0, 1.0)
    } else {
        1.0
    };
    0.60 + 0.15 * scale
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(hlc: &[(f64, f64, f64)]) -> Vec<Bar> {
        let base = NaiveDate::from_ymd_opt(2026, 1, 20)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        hlc.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| Bar {
                instrument: "TEST".into(),
                timeframe: Timeframe::M5,
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open: close,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    /// Falling then rising bars, ~5% amplitude over 20 bars.
    fn v_shape() -> Vec<Bar> {
        let mut hlc = Vec::new();
        let mut price = 105.0;
        for _ in 0..10 {
            hlc.push((price + 0.3, price - 0.3, price - 0.2));
            price -= 0.55;
        }
        for _ in 0..10 {
            hlc.push((price + 0.3, price - 0.3, price + 0.2));
            price += 0.55;
        }
        make_bars(&hlc)
    }

    fn config() -> ChanConfig {
        ChanConfig {
            stroke_min_bars: 3,
            stroke_min_amplitude: 0.005,
            min_bars_for_signal: 10,
            ..Default::default()
        }
    }

    #[test]
    fn v_shape_yields_exactly_one_buy1() {
        let bars = v_shape();
        let snapshot = analyze_timeframe("TEST", Timeframe::M5, &bars, &config()).unwrap();
        let buy1: Vec<_> = snapshot
            .signals
            .iter()
            .filter(|s| s.kind == SignalKind::Buy1)
            .collect();
        assert_eq!(buy1.len(), 1, "signals: {:?}", snapshot.signals);
        // The signal fires at the reversal bottom.
        let bottom = snapshot
            .fractals
            .iter()
            .find(|f| f.kind == FractalKind::Bottom)
            .unwrap();
        assert_eq!(buy1[0].timestamp, bottom.timestamp);
        assert!((buy1[0].price - bottom.price).abs() < 1e-12);
        assert!((0.50..=0.65).contains(&buy1[0].confidence));
    }

    #[test]
    fn inverted_v_yields_sell1() {
        let mut hlc = Vec::new();
        let mut price = 100.0;
        for _ in 0..10 {
            hlc.push((price + 0.3, price - 0.3, price + 0.2));
            price += 0.55;
        }
        for _ in 0..10 {
            hlc.push((price + 0.3, price - 0.3, price - 0.2));
            price -= 0.55;
        }
        let bars = make_bars(&hlc);
        let snapshot = analyze_timeframe("TEST", Timeframe::M5, &bars, &config()).unwrap();
        let sell1: Vec<_> = snapshot
            .signals
            .iter()
            .filter(|s| s.kind == SignalKind::Sell1)
            .collect();
        assert_eq!(sell1.len(), 1, "signals: {:?}", snapshot.signals);
    }

    #[test]
    fn flat_market_yields_nothing() {
        let bars = make_bars(&[(10.0, 9.0, 9.5); 20]);
        let snapshot = analyze_timeframe("TEST", Timeframe::M5, &bars, &config()).unwrap();
        assert!(snapshot.fractals.is_empty());
        assert!(snapshot.strokes.is_empty());
        assert!(snapshot.signals.is_empty());
    }

    #[test]
    fn insufficient_history_suppresses_signals() {
        let bars = v_shape();
        let config = ChanConfig {
            min_bars_for_signal: 50,
            ..config()
        };
        let snapshot = analyze_timeframe("TEST", Timeframe::M5, &bars, &config).unwrap();
        assert!(snapshot.signals.is_empty());
        // Structural entities are still derived.
        assert!(!snapshot.fractals.is_empty());
    }

    #[test]
    fn pivot_break_upward_yields_buy2_at_bar_high() {
        // Consolidation around [100, 102], then a breakout bar with high 105.
        let mut hlc = vec![
            (102.5, 99.5, 101.0),
            (102.0, 100.0, 101.5),
            (102.2, 99.8, 100.8),
            (101.8, 100.2, 101.2),
            (102.0, 100.0, 101.0),
            (102.1, 99.9, 101.3),
        ];
        hlc.push((105.0, 103.2, 104.5)); // break: close above the bound
        for i in 0..6 {
            let p = 104.8 + 0.3 * i as f64;
            hlc.push((p + 0.4, p - 0.4, p));
        }
        let bars = make_bars(&hlc);
        let cfg = ChanConfig {
            pivot_threshold: 0.0,
            pivot_min_bars: 5,
            min_bars_for_signal: 10,
            ..config()
        };
        let snapshot = analyze_timeframe("TEST", Timeframe::M5, &bars, &cfg).unwrap();
        let buy2: Vec<_> = snapshot
            .signals
            .iter()
            .filter(|s| s.kind == SignalKind::Buy2)
            .collect();
        assert_eq!(buy2.len(), 1, "signals: {:?}", snapshot.signals);
        assert!((buy2[0].price - 105.0).abs() < 1e-12);
        assert!((0.60..=0.75).contains(&buy2[0].confidence));
    }

    #[test]
    fn data_quality_error_propagates() {
        let mut bars = v_shape();
        bars[3].close = f64::NAN;
        bars[3].open = f64::NAN;
        let result = analyze_timeframe("TEST", Timeframe::M5, &bars, &config());
        assert!(matches!(result, Err(DataQualityError::NonFinite { .. })));
    }

    #[test]
    fn rerun_is_idempotent() {
        let bars = v_shape();
        let cfg = config();
        let a = analyze_timeframe("TEST", Timeframe::M5, &bars, &cfg).unwrap();
        let b = analyze_timeframe("TEST", Timeframe::M5, &bars, &cfg).unwrap();
        assert_eq!(a, b);
        // Byte-identical serialized output.
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }
}
