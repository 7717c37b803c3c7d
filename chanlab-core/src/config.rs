//! Pipeline and risk configuration.
//!
//! Every recognized option is validated once at initialization; an invalid
//! threshold aborts the run before any bar is processed.

use crate::domain::Timeframe;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tie-break policy for flat tops/bottoms.
///
/// Equal-high markets (circuit-breaker-limited instruments) are common in the
/// target domain, so this is configurable rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FractalTiePolicy {
    /// Strict inequality on both sides; equal highs/lows form no fractal.
    Strict,
    /// The earlier bar of an equal pair wins (strict left, non-strict right).
    FirstWins,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("pivot_threshold must be >= 0, got {0}")]
    PivotThreshold(f64),
    #[error("pivot_min_bars must be >= 2, got {0}")]
    PivotMinBars(usize),
    #[error("stroke_min_bars must be >= 1, got {0}")]
    StrokeMinBars(usize),
    #[error("stroke_min_amplitude must be >= 0, got {0}")]
    StrokeMinAmplitude(f64),
    #[error("kelly_fraction must be in [0, 1], got {0}")]
    KellyFraction(f64),
    #[error("stop_loss_pct must be in (0, 1), got {0}")]
    StopLossPct(f64),
    #[error("risk_reward_ratio must be > 0, got {0}")]
    RiskRewardRatio(f64),
    #[error("max_position_size must be in (0, 1], got {0}")]
    MaxPositionSize(f64),
    #[error("max_loss_per_trade must be in (0, 1], got {0}")]
    MaxLossPerTrade(f64),
    #[error("min_bars_for_signal must be >= 3, got {0}")]
    MinBarsForSignal(usize),
    #[error("confirm_bars must be >= 1, got {0}")]
    ConfirmBars(usize),
    #[error("min_exit_tier must be in 1..=3, got {0}")]
    MinExitTier(u8),
    #[error("resonance_tolerance_bars must be >= 1, got {0}")]
    ResonanceToleranceBars(u32),
    #[error("confirmation_timeframes must name at least 2 timeframes for resonance, got {0}")]
    ConfirmationTimeframes(usize),
}

/// Pass-through configuration surface for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChanConfig {
    // ── Fractal detection ──
    pub fractal_tie_policy: FractalTiePolicy,
    /// Trailing bars required before a tail fractal counts as confirmed.
    pub confirm_bars: usize,

    // ── Stroke assembly ──
    pub stroke_min_bars: usize,
    /// Minimum price amplitude as a fraction of the start price.
    pub stroke_min_amplitude: f64,

    // ── Pivot detection ──
    /// Overlap tolerance as a fraction of the pivot's center price.
    pub pivot_threshold: f64,
    pub pivot_min_bars: usize,

    // ── Signal classification ──
    pub min_bars_for_signal: usize,
    /// Timeframes participating in tier-3 resonance.
    pub confirmation_timeframes: Vec<Timeframe>,
    /// Resonance time tolerance, in bars of the coarsest participating
    /// timeframe.
    pub resonance_tolerance_bars: u32,

    // ── Risk management ──
    pub max_loss_per_trade: f64,
    pub max_position_size: f64,
    pub stop_loss_pct: f64,
    /// Reward:risk ratio for the take-profit level (2.0 means 1:2).
    pub risk_reward_ratio: f64,
    pub kelly_fraction: f64,
    /// Minimum tier of an opposing signal that closes an open position.
    pub min_exit_tier: u8,
}

impl Default for ChanConfig {
    fn default() -> Self {
        Self {
            fractal_tie_policy: FractalTiePolicy::Strict,
            confirm_bars: 1,
            stroke_min_bars: 4,
            stroke_min_amplitude: 0.005,
            pivot_threshold: 0.02,
            pivot_min_bars: 5,
            min_bars_for_signal: 12,
            confirmation_timeframes: vec![Timeframe::M5, Timeframe::M30],
            resonance_tolerance_bars: 1,
            max_loss_per_trade: 0.02,
            max_position_size: 0.10,
            stop_loss_pct: 0.03,
            risk_reward_ratio: 2.0,
            kelly_fraction: 0.25,
            min_exit_tier: 1,
        }
    }
}

impl ChanConfig {
    /// Fail-fast validation. Called before any bar is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pivot_threshold < 0.0 || !self.pivot_threshold.is_finite() {
            return Err(ConfigError::PivotThreshold(self.pivot_threshold));
        }
        if self.pivot_min_bars < 2 {
            return Err(ConfigError::PivotMinBars(self.pivot_min_bars));
        }
        if self.stroke_min_bars < 1 {
            return Err(ConfigError::StrokeMinBars(self.stroke_min_bars));
        }
        if self.stroke_min_amplitude < 0.0 || !self.stroke_min_amplitude.is_finite() {
            return Err(ConfigError::StrokeMinAmplitude(self.stroke_min_amplitude));
        }
        if !(0.0..=1.0).contains(&self.kelly_fraction) {
            return Err(ConfigError::KellyFraction(self.kelly_fraction));
        }
        if self.stop_loss_pct <= 0.0 || self.stop_loss_pct >= 1.0 {
            return Err(ConfigError::StopLossPct(self.stop_loss_pct));
        }
        if self.risk_reward_ratio <= 0.0 || !self.risk_reward_ratio.is_finite() {
            return Err(ConfigError::RiskRewardRatio(self.risk_reward_ratio));
        }
        if self.max_position_size <= 0.0 || self.max_position_size > 1.0 {
            return Err(ConfigError::MaxPositionSize(self.max_position_size));
        }
        if self.max_loss_per_trade <= 0.0 || self.max_loss_per_trade > 1.0 {
            return Err(ConfigError::MaxLossPerTrade(self.max_loss_per_trade));
        }
        if self.min_bars_for_signal < 3 {
            return Err(ConfigError::MinBarsForSignal(self.min_bars_for_signal));
        }
        if self.confirm_bars < 1 {
            return Err(ConfigError::ConfirmBars(self.confirm_bars));
        }
        if !(1..=3).contains(&self.min_exit_tier) {
            return Err(ConfigError::MinExitTier(self.min_exit_tier));
        }
        if self.resonance_tolerance_bars < 1 {
            return Err(ConfigError::ResonanceToleranceBars(
                self.resonance_tolerance_bars,
            ));
        }
        if self.confirmation_timeframes.len() < 2 {
            return Err(ConfigError::ConfirmationTimeframes(
                self.confirmation_timeframes.len(),
            ));
        }
        Ok(())
    }

    /// The coarsest timeframe participating in tier-3 resonance.
    pub fn coarsest_confirmation_timeframe(&self) -> Option<Timeframe> {
        self.confirmation_timeframes.iter().copied().max()
    }

    /// Resonance time tolerance as a duration.
    pub fn resonance_tolerance(&self) -> chrono::Duration {
        let base = self
            .coarsest_confirmation_timeframe()
            .map(|tf| tf.minutes())
            .unwrap_or(1);
        chrono::Duration::minutes(base * i64::from(self.resonance_tolerance_bars))
    }
}
