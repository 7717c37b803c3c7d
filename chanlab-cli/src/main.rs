//! ChanLab CLI — signal analysis and backtest commands.
//!
//! Commands:
//! - `analyze` — run the pattern pipeline and print/export the signal table
//! - `backtest` — run the risk-managed replay over the universe and write
//!   report artifacts
//!
//! Both commands accept a TOML config file; without one, a synthetic smoke
//! configuration is used.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chanlab_runner::config::{DataSource, RunConfig};
use chanlab_runner::report::write_artifacts;
use chanlab_runner::runner::{run_batch, CancellationToken, RunSummary};

#[derive(Parser)]
#[command(name = "chanlab", about = "ChanLab — Chan-theory signal pipeline and backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the pattern pipeline and print the classified signals.
    Analyze {
        /// Path to a TOML run config. Defaults to a synthetic smoke config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the data source with a CSV directory.
        #[arg(long)]
        data: Option<PathBuf>,
    },
    /// Run the full backtest and write report artifacts.
    Backtest {
        /// Path to a TOML run config. Defaults to a synthetic smoke config.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the data source with a CSV directory.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze { config, data } => run_analyze(config, data),
        Commands::Backtest { config, data, out } => run_backtest(config, data, out),
    }
}

fn load_config(path: Option<PathBuf>, data: Option<PathBuf>) -> Result<RunConfig> {
    let mut config = match path {
        Some(path) => RunConfig::load(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => RunConfig::default(),
    };
    if let Some(dir) = data {
        config.data = DataSource::Csv { dir };
    }
    Ok(config)
}

fn run_analyze(config: Option<PathBuf>, data: Option<PathBuf>) -> Result<()> {
    let config = load_config(config, data)?;
    let summary = run_batch(&config, &CancellationToken::new())?;
    report_failures(&summary);

    for result in &summary.completed {
        println!("{} — {} signals", result.instrument, result.signals.len());
        for signal in &result.signals {
            println!(
                "  {}  {:<6} {:<5} price {:>10.2}  confidence {:.2}",
                signal.timestamp, signal.kind, signal.timeframe, signal.price, signal.confidence
            );
        }
    }
    Ok(())
}

fn run_backtest(config: Option<PathBuf>, data: Option<PathBuf>, out: PathBuf) -> Result<()> {
    let config = load_config(config, data)?;
    let summary = run_batch(&config, &CancellationToken::new())?;
    report_failures(&summary);

    for result in &summary.completed {
        let m = &result.metrics;
        println!(
            "{} — trades {:>3}  return {:>7.2}%  max_dd {:>6.2}%  win_rate {}  sharpe {}",
            result.instrument,
            m.trade_count,
            m.total_return * 100.0,
            m.max_drawdown * 100.0,
            fmt_opt_pct(m.win_rate),
            fmt_opt(m.sharpe),
        );
    }

    let dir = write_artifacts(&summary, &out).context("writing report artifacts")?;
    println!("artifacts: {}", dir.display());
    Ok(())
}

fn report_failures(summary: &RunSummary) {
    for failed in &summary.failed {
        eprintln!("FAILED {}: {}", failed.instrument, failed.error);
    }
    for name in &summary.cancelled {
        eprintln!("CANCELLED {name}");
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => "n/a".into(),
    }
}

fn fmt_opt_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "n/a".into(),
    }
}
