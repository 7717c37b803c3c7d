//! Stroke assembly: fold fractals into alternating directional segments.

use crate::config::ChanConfig;
use crate::domain::{Fractal, FractalKind, Stroke};

/// Greedily fold a fractal sequence into strokes, left to right.
///
/// A stroke starts at the first fractal and extends to the next opposite-kind
/// fractal. A candidate below the bar-count or amplitude threshold is not
/// emitted; the intermediate fractal is discarded and the stroke extends to
/// the following opposite-kind fractal instead (merge-forward). Successive
/// same-kind fractals keep the more extreme one, pulling the previous stroke's
/// endpoint along with it.
///
/// The loop is a flat worklist walk, so long noisy sequences cannot blow the
/// stack the way a recursive merge would.
///
/// Output strictly alternates direction: every stroke starts where the
/// previous one ended.
pub fn build(fractals: &[Fractal], config: &ChanConfig) -> Vec<Stroke> {
    let mut strokes: Vec<Stroke> = Vec::new();
    let mut anchor: Option<Fractal> = None;

    for fractal in fractals {
        let Some(current) = &mut anchor else {
            anchor = Some(fractal.clone());
            continue;
        };

        if current.kind == fractal.kind {
            if is_more_extreme(fractal, current) {
                // The anchor is the previous stroke's endpoint; move both.
                if let Some(last) = strokes.last_mut() {
                    if last.end.kind == fractal.kind {
                        *last = Stroke::between(last.start.clone(), fractal.clone());
                    }
                }
                *current = fractal.clone();
            }
            continue;
        }

        let candidate = Stroke::between(current.clone(), fractal.clone());
        if candidate.bar_span() >= config.stroke_min_bars
            && candidate.amplitude() >= config.stroke_min_amplitude
        {
            strokes.push(candidate);
            *current = fractal.clone();
        }
        // Below threshold: discard this fractal and keep scanning forward.
    }

    strokes
}

fn is_more_extreme(candidate: &Fractal, reference: &Fractal) -> bool {
    match candidate.kind {
        FractalKind::Top => candidate.price > reference.price,
        FractalKind::Bottom => candidate.price < reference.price,
    }
}
