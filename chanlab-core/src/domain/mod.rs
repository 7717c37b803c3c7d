//! Domain types for the Chan pipeline.

pub mod bar;
pub mod fractal;
pub mod pivot;
pub mod position;
pub mod signal;
pub mod stroke;
pub mod timeframe;
pub mod trade;

pub use bar::Bar;
pub use fractal::{Confirmation, Fractal, FractalKind};
pub use pivot::{Pivot, PivotTrend};
pub use position::{Position, PositionSide, PositionStatus};
pub use signal::{Signal, SignalKind, SignalSide};
pub use stroke::{Direction, Stroke};
pub use timeframe::Timeframe;
pub use trade::{ExitReason, TradeRecord};
