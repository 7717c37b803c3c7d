//! Pivot (hub) detection via a running range intersection.
//!
//! Single forward pass: the candidate bound is the intersection of the bar
//! ranges seen so far; a bar that still intersects (within the configured
//! tolerance) extends the run and tightens the bound, a bar that does not
//! closes the current pivot and seeds a new candidate. This replaces the
//! quadratic all-pairs overlap check with an O(n) scan — the intersection
//! being non-empty already implies every pair of bars in the run overlaps.

use crate::config::ChanConfig;
use crate::domain::{Bar, Confirmation, Pivot, PivotTrend};

/// Detect consolidation ranges in a bar sequence.
///
/// Runs shorter than `pivot_min_bars` are discarded, not emitted. The final
/// run, still extending at the data edge, is emitted as Provisional.
pub fn detect(bars: &[Bar], config: &ChanConfig) -> Vec<Pivot> {
    let mut pivots = Vec::new();
    if bars.len() < config.pivot_min_bars {
        return pivots;
    }

    let mut start = 0usize;
    let mut lo = bars[0].low;
    let mut hi = bars[0].high;

    for (i, bar) in bars.iter().enumerate().skip(1) {
        let epsilon = config.pivot_threshold * (lo + hi) / 2.0;
        if bar.overlaps(lo, hi, epsilon) {
            // Tighten to the true intersection when it is non-empty; a bar
            // that only touches within the tolerance leaves the bound as is.
            let new_lo = lo.max(bar.low);
            let new_hi = hi.min(bar.high);
            if new_lo <= new_hi {
                lo = new_lo;
                hi = new_hi;
            }
        } else {
            close_run(&mut pivots, bars, start, i - 1, lo, hi, config, Confirmation::Confirmed);
            start = i;
            lo = bar.low;
            hi = bar.high;
        }
    }

    let last = bars.len() - 1;
    close_run(&mut pivots, bars, start, last, lo, hi, config, Confirmation::Provisional);
    pivots
}

#[allow(clippy::too_many_arguments)]
fn close_run(
    pivots: &mut Vec<Pivot>,
    bars: &[Bar],
    start: usize,
    end: usize,
    lo: f64,
    hi: f64,
    config: &ChanConfig,
    confirmation: Confirmation,
) {
    let bar_count = end - start + 1;
    if bar_count < config.pivot_min_bars {
        return;
    }
    pivots.push(Pivot {
        timeframe: bars[start].timeframe,
        start_index: start,
        end_index: end,
        start_timestamp: bars[start].timestamp,
        end_timestamp: bars[end].timestamp,
        low: lo,
        high: hi,
        trend: classify_trend(bars, start, end),
        confirmation,
    });
}

/// Trend from the closes surrounding the run: the close just before entry
/// versus the close just after exit (clamped at the sequence edges).
fn classify_trend(bars: &[Bar], start: usize, end: usize) -> PivotTrend {
    let entry = bars[start.saturating_sub(1)].close;
    let exit = bars[(end + 1).min(bars.len() - 1)].close;
    if exit > entry {
        PivotTrend::Rising
    } else if exit < entry {
        PivotTrend::Falling
    } else {
        PivotTrend::Flat
    }
}
