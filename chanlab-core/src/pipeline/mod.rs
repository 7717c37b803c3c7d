//! Pattern-recognition pipeline: fractals → strokes → pivots → signals.
//!
//! Every stage is a pure function of its input window, so re-running the
//! pipeline on an unchanged bar sequence yields identical output.

pub mod classifier;
pub mod fractal;
pub mod pivot;
pub mod resonance;
pub mod stroke;

pub use classifier::{analyze_timeframe, TimeframeSnapshot};
pub use resonance::detect_resonance;
