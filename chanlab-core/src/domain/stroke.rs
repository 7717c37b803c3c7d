//! Stroke — minimal directional segment between two opposite fractals.

use super::fractal::{Confirmation, Fractal, FractalKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// Directional segment connecting a Bottom→Top (Up) or Top→Bottom (Down)
/// fractal pair. Consecutive strokes strictly alternate direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub direction: Direction,
    pub start: Fractal,
    pub end: Fractal,
    pub confirmation: Confirmation,
}

impl Stroke {
    /// Build a stroke from an opposite-kind fractal pair.
    ///
    /// Direction follows the end fractal: ending on a Top means the price
    /// rose (Up), ending on a Bottom means it fell (Down).
    pub fn between(start: Fractal, end: Fractal) -> Stroke {
        debug_assert_ne!(start.kind, end.kind, "stroke endpoints must be opposite kinds");
        let direction = match end.kind {
            FractalKind::Top => Direction::Up,
            FractalKind::Bottom => Direction::Down,
        };
        let confirmation = if start.is_confirmed() && end.is_confirmed() {
            Confirmation::Confirmed
        } else {
            Confirmation::Provisional
        };
        Stroke {
            direction,
            start,
            end,
            confirmation,
        }
    }

    /// Number of bars the stroke spans.
    pub fn bar_span(&self) -> usize {
        self.end.index.saturating_sub(self.start.index)
    }

    /// Price amplitude as a fraction of the start price.
    pub fn amplitude(&self) -> f64 {
        if self.start.price <= 0.0 {
            return 0.0;
        }
        (self.end.price - self.start.price).abs() / self.start.price
    }

    /// A stroke is completed once the fractal that terminates it is confirmed.
    pub fn is_completed(&self) -> bool {
        self.end.is_confirmed()
    }

    pub fn high(&self) -> f64 {
        self.start.price.max(self.end.price)
    }

    pub fn low(&self) -> f64 {
        self.start.price.min(self.end.price)
    }
}
