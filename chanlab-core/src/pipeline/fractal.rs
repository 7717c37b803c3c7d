//! Fractal detection: 3-bar turning points.

use crate::config::{ChanConfig, FractalTiePolicy};
use crate::domain::{Bar, Confirmation, Fractal, FractalKind};

/// Scan a bar sequence for fractals.
///
/// Pure and restartable: the same bars always yield the same fractals. Fewer
/// than 3 bars yields an empty sequence, not an error. With the `Strict` tie
/// policy equal highs/lows form no fractal; with `FirstWins` the earlier bar
/// of an equal pair wins (strict left comparison, non-strict right), which
/// avoids double-counting flat tops.
pub fn detect<'a>(bars: &'a [Bar], config: &ChanConfig) -> impl Iterator<Item = Fractal> + 'a {
    let tie_policy = config.fractal_tie_policy;
    let confirm_bars = config.confirm_bars;
    let len = bars.len();

    (1..len.saturating_sub(1)).filter_map(move |i| {
        let prev = &bars[i - 1];
        let curr = &bars[i];
        let next = &bars[i + 1];

        let kind = classify(prev, curr, next, tie_policy)?;
        let price = match kind {
            FractalKind::Top => curr.high,
            FractalKind::Bottom => curr.low,
        };
        // The fractal already has one trailing bar by construction; it stays
        // provisional until `confirm_bars` trailing bars exist.
        let confirmation = if i + confirm_bars <= len - 1 {
            Confirmation::Confirmed
        } else {
            Confirmation::Provisional
        };
        Some(Fractal {
            timeframe: curr.timeframe,
            index: i,
            timestamp: curr.timestamp,
            kind,
            price,
            confirmation,
        })
    })
}

/// Collect all fractals into a vector.
pub fn detect_all(bars: &[Bar], config: &ChanConfig) -> Vec<Fractal> {
    detect(bars, config).collect()
}

fn classify(prev: &Bar, curr: &Bar, next: &Bar, policy: FractalTiePolicy) -> Option<FractalKind> {
    let (top_right, bottom_right) = match policy {
        FractalTiePolicy::Strict => (curr.high > next.high, curr.low < next.low),
        FractalTiePolicy::FirstWins => (curr.high >= next.high, curr.low <= next.low),
    };

    if curr.high > prev.high && top_right {
        Some(FractalKind::Top)
    } else if curr.low < prev.low && bottom_right {
        Some(FractalKind::Bottom)
    } else {
        None
    }
}
