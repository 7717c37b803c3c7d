//! Tier 3: multi-timeframe resonance.
//!
//! A Buy3/Sell3 fires when tier-1 or tier-2 conditions on the same side hold
//! on two or more configured timeframes within the resonance time tolerance.

use crate::config::ChanConfig;
use crate::domain::{Signal, SignalKind, SignalSide, Timeframe};
use crate::pipeline::TimeframeSnapshot;
use std::collections::BTreeMap;

/// Scan per-timeframe snapshots for resonant signal clusters.
///
/// Only timeframes named in `confirmation_timeframes` contribute. Each
/// contributing signal is consumed by at most one resonance, so a single
/// coarse-timeframe signal cannot fan out into several Buy3s.
pub fn detect_resonance(
    snapshots: &BTreeMap<Timeframe, TimeframeSnapshot>,
    config: &ChanConfig,
) -> Vec<Signal> {
    let mut out = Vec::new();
    out.extend(resonate_side(snapshots, config, SignalSide::Buy));
    out.extend(resonate_side(snapshots, config, SignalSide::Sell));
    out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    out
}

fn resonate_side(
    snapshots: &BTreeMap<Timeframe, TimeframeSnapshot>,
    config: &ChanConfig,
    side: SignalSide,
) -> Vec<Signal> {
    let mut candidates: Vec<&Signal> = snapshots
        .iter()
        .filter(|(tf, _)| config.confirmation_timeframes.contains(*tf))
        .flat_map(|(_, snap)| snap.signals.iter())
        .filter(|s| s.kind.side() == side && s.kind.tier() < 3)
        .collect();
    candidates.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.timeframe.cmp(&b.timeframe))
    });

    let tolerance = config.resonance_tolerance();
    let mut out = Vec::new();
    let mut i = 0;
    while i < candidates.len() {
        let window_end = candidates[i].timestamp + tolerance;
        let mut j = i + 1;
        while j < candidates.len() && candidates[j].timestamp <= window_end {
            j += 1;
        }
        let window = &candidates[i..j];
        if distinct_timeframes(window) >= 2 {
            out.push(resonance_signal(window, side));
            // Consume the whole cluster.
            i = j;
        } else {
            i += 1;
        }
    }
    out
}

fn distinct_timeframes(window: &[&Signal]) -> usize {
    let mut tfs: Vec<Timeframe> = window.iter().map(|s| s.timeframe).collect();
    tfs.sort();
    tfs.dedup();
    tfs.len()
}

fn resonance_signal(window: &[&Signal], side: SignalSide) -> Signal {
    // Strongest contributor supplies the trigger price; the resonance is
    // stamped when its last contributor arrives.
    let strongest = window
        .iter()
        .max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .copied()
        .unwrap_or(window[0]);
    let latest = window
        .iter()
        .map(|s| s.timestamp)
        .max()
        .unwrap_or(strongest.timestamp);
    let coarsest = window
        .iter()
        .map(|s| s.timeframe)
        .max()
        .unwrap_or(strongest.timeframe);
    let n_tfs = distinct_timeframes(window);

    Signal {
        instrument: strongest.instrument.clone(),
        timeframe: coarsest,
        kind: SignalKind::resonance(side),
        price: strongest.price,
        timestamp: latest,
        confidence: tier3_confidence(strongest.confidence, n_tfs),
    }
}

/// Confidence in [0.80, 0.95]: the strongest contributor plus a resonance
/// bonus, plus a small increment per extra participating timeframe. Never
/// below any contributor.
fn tier3_confidence(max_contrib: f64, n_tfs: usize) -> f64 {
    let extra = n_tfs.saturating_sub(2) as f64;
    (max_contrib + 0.15 + 0.05 * extra).clamp(0.80, 0.95)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(minute: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 20)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
            + chrono::Duration::minutes(minute)
    }

    fn signal(tf: Timeframe, kind: SignalKind, minute: i64, confidence: f64) -> Signal {
        Signal {
            instrument: "TEST".into(),
            timeframe: tf,
            kind,
            price: 100.0,
            timestamp: ts(minute),
            confidence,
        }
    }

    fn snapshot(tf: Timeframe, signals: Vec<Signal>) -> TimeframeSnapshot {
        TimeframeSnapshot {
            instrument: "TEST".into(),
            timeframe: tf,
            bar_count: 100,
            fractals: Vec::new(),
            strokes: Vec::new(),
            pivots: Vec::new(),
            signals,
        }
    }

    fn snapshots(entries: Vec<(Timeframe, Vec<Signal>)>) -> BTreeMap<Timeframe, TimeframeSnapshot> {
        entries
            .into_iter()
            .map(|(tf, sigs)| (tf, snapshot(tf, sigs)))
            .collect()
    }

    #[test]
    fn aligned_buy_conditions_resonate() {
        let snaps = snapshots(vec![
            (
                Timeframe::M5,
                vec![signal(Timeframe::M5, SignalKind::Buy1, 0, 0.55)],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Buy2, 10, 0.70)],
            ),
        ]);
        let out = detect_resonance(&snaps, &ChanConfig::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SignalKind::Buy3);
        assert_eq!(out[0].timeframe, Timeframe::M30);
        assert_eq!(out[0].timestamp, ts(10));
        assert!((0.80..=0.95).contains(&out[0].confidence));
        // Never below the strongest contributor.
        assert!(out[0].confidence >= 0.70);
    }

    #[test]
    fn single_timeframe_does_not_resonate() {
        let snaps = snapshots(vec![(
            Timeframe::M5,
            vec![
                signal(Timeframe::M5, SignalKind::Buy1, 0, 0.55),
                signal(Timeframe::M5, SignalKind::Buy2, 5, 0.65),
            ],
        )]);
        assert!(detect_resonance(&snaps, &ChanConfig::default()).is_empty());
    }

    #[test]
    fn opposite_sides_do_not_resonate() {
        let snaps = snapshots(vec![
            (
                Timeframe::M5,
                vec![signal(Timeframe::M5, SignalKind::Buy1, 0, 0.55)],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Sell1, 5, 0.55)],
            ),
        ]);
        assert!(detect_resonance(&snaps, &ChanConfig::default()).is_empty());
    }

    #[test]
    fn outside_tolerance_does_not_resonate() {
        // Default tolerance: 1 bar of M30 = 30 minutes.
        let snaps = snapshots(vec![
            (
                Timeframe::M5,
                vec![signal(Timeframe::M5, SignalKind::Buy1, 0, 0.55)],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Buy1, 45, 0.55)],
            ),
        ]);
        assert!(detect_resonance(&snaps, &ChanConfig::default()).is_empty());
    }

    #[test]
    fn unconfigured_timeframe_is_ignored() {
        let snaps = snapshots(vec![
            (
                Timeframe::M1,
                vec![signal(Timeframe::M1, SignalKind::Buy1, 0, 0.55)],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Buy1, 5, 0.55)],
            ),
        ]);
        // M1 is not in the default confirmation set.
        assert!(detect_resonance(&snaps, &ChanConfig::default()).is_empty());
    }

    #[test]
    fn cluster_is_consumed_once() {
        let snaps = snapshots(vec![
            (
                Timeframe::M5,
                vec![
                    signal(Timeframe::M5, SignalKind::Buy1, 0, 0.55),
                    signal(Timeframe::M5, SignalKind::Buy2, 8, 0.65),
                ],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Buy1, 10, 0.60)],
            ),
        ]);
        let out = detect_resonance(&snaps, &ChanConfig::default());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn three_timeframes_score_above_two() {
        let config = ChanConfig {
            confirmation_timeframes: vec![Timeframe::M5, Timeframe::M15, Timeframe::M30],
            ..Default::default()
        };
        let two = snapshots(vec![
            (
                Timeframe::M5,
                vec![signal(Timeframe::M5, SignalKind::Buy1, 0, 0.55)],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Buy1, 5, 0.55)],
            ),
        ]);
        let three = snapshots(vec![
            (
                Timeframe::M5,
                vec![signal(Timeframe::M5, SignalKind::Buy1, 0, 0.55)],
            ),
            (
                Timeframe::M15,
                vec![signal(Timeframe::M15, SignalKind::Buy1, 3, 0.55)],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Buy1, 5, 0.55)],
            ),
        ]);
        let a = detect_resonance(&two, &config);
        let b = detect_resonance(&three, &config);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
        assert!(b[0].confidence > a[0].confidence);
    }

    #[test]
    fn resonance_confidence_stays_in_band() {
        let snaps = snapshots(vec![
            (
                Timeframe::M5,
                vec![signal(Timeframe::M5, SignalKind::Buy2, 0, 0.75)],
            ),
            (
                Timeframe::M30,
                vec![signal(Timeframe::M30, SignalKind::Buy2, 5, 0.75)],
            ),
        ]);
        let out = detect_resonance(&snaps, &ChanConfig::default());
        assert_eq!(out.len(), 1);
        assert!((0.80..=0.95).contains(&out[0].confidence));
    }
}
