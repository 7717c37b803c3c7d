//! Serializable run configuration.

use chanlab_core::domain::Timeframe;
use chanlab_core::ChanConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid pipeline config: {0}")]
    Chan(#[from] chanlab_core::ConfigError),
    #[error("universe is empty")]
    EmptyUniverse,
    #[error("initial_equity must be > 0, got {0}")]
    InitialEquity(f64),
    #[error("primary_timeframe {0} must be in analysis_timeframes")]
    PrimaryNotAnalyzed(Timeframe),
    #[error("failed to build worker pool: {0}")]
    Workers(String),
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DataSource {
    /// One CSV file per (instrument, timeframe) under `dir`, named
    /// `{instrument}_{timeframe}.csv`.
    Csv { dir: PathBuf },
    /// Deterministic synthetic random walk, for smoke runs and tests.
    Synthetic { bars: usize, seed: u64 },
}

/// Everything needed to reproduce a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Instruments to process.
    pub universe: Vec<String>,
    /// Timeframe the backtest replays on.
    pub primary_timeframe: Timeframe,
    /// Timeframes the pipeline analyzes (superset of the resonance set).
    pub analysis_timeframes: Vec<Timeframe>,
    pub initial_equity: f64,
    /// Worker threads for the instrument fan-out. 0 means one per core.
    #[serde(default)]
    pub workers: usize,
    pub data: DataSource,
    /// Pipeline and risk parameters.
    #[serde(default)]
    pub chan: ChanConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            universe: vec!["sh600519".into()],
            primary_timeframe: Timeframe::M5,
            analysis_timeframes: vec![Timeframe::M5, Timeframe::M30],
            initial_equity: 100_000.0,
            workers: 0,
            data: DataSource::Synthetic {
                bars: 500,
                seed: 42,
            },
            chan: ChanConfig::default(),
        }
    }
}

impl RunConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.universe.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }
        if self.initial_equity <= 0.0 || !self.initial_equity.is_finite() {
            return Err(ConfigError::InitialEquity(self.initial_equity));
        }
        if !self.analysis_timeframes.contains(&self.primary_timeframe) {
            return Err(ConfigError::PrimaryNotAnalyzed(self.primary_timeframe));
        }
        self.chan.validate()?;
        Ok(())
    }

    /// Deterministic content hash: identical configs share a RunId, so cached
    /// artifacts can be reused across invocations.
    pub fn run_id(&self) -> RunId {
        // Serialization of a validated config cannot fail: the type holds no
        // non-serializable state.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
