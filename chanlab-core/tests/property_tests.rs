//! Property tests for pipeline and engine invariants.
//!
//! Uses proptest to verify:
//! 1. Degenerate inputs — short windows yield empty structures, never panics
//! 2. Stroke alternation — output directions strictly alternate and chain
//! 3. Pivot bounds — every bar inside a pivot overlaps its bound
//! 4. Risk caps — accepted sizes respect both hard caps at any confidence
//! 5. Equity accounting — final equity equals initial plus realized P&L
//! 6. Idempotence — rerunning any stage on unchanged input is a no-op

use chrono::NaiveDate;
use proptest::prelude::*;

use chanlab_core::config::ChanConfig;
use chanlab_core::domain::{Bar, SignalKind, Timeframe};
use chanlab_core::engine::BacktestEngine;
use chanlab_core::pipeline::{analyze_timeframe, fractal, pivot, stroke};
use chanlab_core::risk::{RiskManager, SizingDecision};

// ── Strategies (proptest) ────────────────────────────────────────────

/// A random walk of sane bars: positive prices, high/low bracketing
/// open/close, strictly increasing timestamps.
fn arb_bars(max_len: usize) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((0.0..1.0f64, 0.0..1.0f64, 0.0..1.0f64), 0..max_len).prop_map(|steps| {
        let base = NaiveDate::from_ymd_opt(2026, 1, 20)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let mut price = 100.0f64;
        steps
            .iter()
            .enumerate()
            .map(|(i, &(drift, up, down))| {
                price = (price * (1.0 + (drift - 0.5) * 0.02)).max(1.0);
                let open = price;
                let close = price * (1.0 + (up - down) * 0.01);
                let high = open.max(close) * (1.0 + up * 0.005);
                let low = (open.min(close) * (1.0 - down * 0.005)).max(0.01);
                Bar {
                    instrument: "PROP".into(),
                    timeframe: Timeframe::M5,
                    timestamp: base + chrono::Duration::minutes(5 * i as i64),
                    open,
                    high,
                    low,
                    close,
                    volume: 1000.0,
                }
            })
            .collect()
    })
}

fn arb_confidence() -> impl Strategy<Value = f64> {
    0.0..1.0f64
}

// ── 1. Degenerate inputs ─────────────────────────────────────────────

proptest! {
    /// Fewer than 3 bars can never form a fractal.
    #[test]
    fn short_windows_yield_no_fractals(bars in arb_bars(3)) {
        prop_assume!(bars.len() < 3);
        let config = ChanConfig::default();
        prop_assert!(fractal::detect_all(&bars, &config).is_empty());
    }

    /// The full single-timeframe pipeline never panics on sane input.
    #[test]
    fn pipeline_total_on_sane_bars(bars in arb_bars(60)) {
        let config = ChanConfig::default();
        let snapshot = analyze_timeframe("PROP", Timeframe::M5, &bars, &config).unwrap();
        prop_assert_eq!(snapshot.bar_count, bars.len());
    }
}

// ── 2. Stroke alternation ────────────────────────────────────────────

proptest! {
    /// Strokes strictly alternate direction and chain end-to-start.
    #[test]
    fn strokes_alternate_and_chain(bars in arb_bars(60)) {
        let config = ChanConfig {
            stroke_min_bars: 2,
            stroke_min_amplitude: 0.0,
            ..Default::default()
        };
        let fractals = fractal::detect_all(&bars, &config);
        let strokes = stroke::build(&fractals, &config);
        for pair in strokes.windows(2) {
            prop_assert_ne!(pair[0].direction, pair[1].direction);
            prop_assert_eq!(&pair[1].start, &pair[0].end);
        }
        for s in &strokes {
            prop_assert!(s.bar_span() >= config.stroke_min_bars);
            prop_assert!(s.end.index > s.start.index);
        }
    }
}

// ── 3. Pivot bounds ──────────────────────────────────────────────────

proptest! {
    /// With zero tolerance, every bar inside a pivot overlaps its bound and
    /// runs meet the minimum length.
    #[test]
    fn pivot_bars_overlap_bound(bars in arb_bars(60)) {
        let config = ChanConfig {
            pivot_threshold: 0.0,
            ..Default::default()
        };
        for p in pivot::detect(&bars, &config) {
            prop_assert!(p.bar_count() >= config.pivot_min_bars);
            prop_assert!(p.low <= p.high);
            for bar in &bars[p.start_index..=p.end_index] {
                prop_assert!(bar.overlaps(p.low, p.high, 1e-9));
            }
        }
    }
}

// ── 4. Risk caps ─────────────────────────────────────────────────────

proptest! {
    /// Any accepted order respects the position-size cap and the worst-case
    /// loss cap, regardless of confidence.
    #[test]
    fn accepted_sizes_respect_caps(confidence in arb_confidence(), equity in 1.0..1e9f64) {
        let config = ChanConfig {
            kelly_fraction: 1.0, // widest sizing the config allows
            ..Default::default()
        };
        let manager = RiskManager::new(&config);
        let signal = chanlab_core::domain::Signal {
            instrument: "PROP".into(),
            timeframe: Timeframe::M5,
            kind: SignalKind::Buy1,
            price: 100.0,
            timestamp: NaiveDate::from_ymd_opt(2026, 1, 20)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            confidence,
        };
        if let SizingDecision::Accepted(intent) = manager.evaluate(&signal, equity, None) {
            prop_assert!(intent.size_frac > 0.0);
            prop_assert!(intent.size_frac <= config.max_position_size + 1e-12);
            prop_assert!(
                intent.size_frac * config.stop_loss_pct <= config.max_loss_per_trade + 1e-12
            );
        }
    }
}

// ── 5. Equity accounting ─────────────────────────────────────────────

proptest! {
    /// Final equity is exactly initial equity plus the sum of realized P&L,
    /// and trades never overlap in time.
    #[test]
    fn equity_identity_holds(bars in arb_bars(60)) {
        prop_assume!(bars.len() >= 12);
        let config = ChanConfig {
            stroke_min_bars: 2,
            ..Default::default()
        };
        let snapshot = analyze_timeframe("PROP", Timeframe::M5, &bars, &config).unwrap();
        let engine = BacktestEngine::new(&config);
        let outcome = engine
            .run("PROP", &bars, &snapshot.signals, 100_000.0)
            .unwrap();

        let realized: f64 = outcome.ledger.trades.iter().map(|t| t.pnl).sum();
        prop_assert!((outcome.final_equity - (100_000.0 + realized)).abs() < 1e-6);

        for pair in outcome.ledger.trades.windows(2) {
            prop_assert!(pair[1].entry_timestamp >= pair[0].exit_timestamp);
        }
    }
}

// ── 6. Idempotence ───────────────────────────────────────────────────

proptest! {
    /// Rerunning the whole pipeline and replay on unchanged bars yields
    /// identical output.
    #[test]
    fn rerun_is_byte_identical(bars in arb_bars(40)) {
        let config = ChanConfig::default();
        let a = analyze_timeframe("PROP", Timeframe::M5, &bars, &config).unwrap();
        let b = analyze_timeframe("PROP", Timeframe::M5, &bars, &config).unwrap();
        prop_assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );

        let engine = BacktestEngine::new(&config);
        let x = engine.run("PROP", &bars, &a.signals, 50_000.0).unwrap();
        let y = engine.run("PROP", &bars, &b.signals, 50_000.0).unwrap();
        prop_assert_eq!(x, y);
    }
}
