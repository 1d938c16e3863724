//! Command-line arguments.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fetch` | Download world indicators, resample to daily and merge onto prices |
//! | `eda` | Run the exploratory analysis battery over the price file |
//! | `correlate` | Correlation matrix (or one pair) over the merged dataset |
//! | `model` | Chronological split, fit and score a forecasting model |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--config` | resolved | JSON configuration file |
//! | `--data-dir` | `data` | Directory holding the CSV datasets |
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--strict` | `false` | Exit 5 when the envelope carries warnings or errors |
//!
//! # Examples
//!
//! ```bash
//! brentscope fetch --start 1987-05-20 --end 2022-11-14
//! brentscope eda --charts-dir charts --pretty
//! brentscope correlate --pair "GDP Growth (%)" Price
//! brentscope model --order 2,1,1 --train-fraction 0.9
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Brent crude prices against world economic indicators.
#[derive(Debug, Parser)]
#[command(name = "brentscope", author, version, about)]
pub struct Cli {
    /// Configuration file; defaults to `$BRENTSCOPE_HOME/config.json` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `data.data_dir` from the configuration.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Treat envelope warnings and errors as a failure (exit code 5).
    #[arg(long, global = true, default_value_t = false)]
    pub strict: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch indicators, write `world_data.csv` and `merged_data.csv`.
    Fetch(FetchArgs),
    /// Exploratory analysis of the price series.
    Eda(EdaArgs),
    /// Pearson correlations over `merged_data.csv`.
    Correlate(CorrelateArgs),
    /// Fit and score a forecasting model on the price series.
    Model(ModelArgs),
}

impl Command {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fetch(_) => "fetch",
            Self::Eda(_) => "eda",
            Self::Correlate(_) => "correlate",
            Self::Model(_) => "model",
        }
    }
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// First date of the window (inclusive).
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date of the window (inclusive).
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// World Bank country or aggregate code.
    #[arg(long)]
    pub country: Option<String>,
}

#[derive(Debug, Args)]
pub struct EdaArgs {
    /// Write SVG charts into this directory.
    #[arg(long)]
    pub charts_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct CorrelateArgs {
    /// Correlate only these two columns (indicator name, code or `Price`).
    #[arg(long, num_args = 2, value_names = ["FIRST", "SECOND"])]
    pub pair: Option<Vec<String>>,

    /// Write the correlation heatmap into this directory.
    #[arg(long)]
    pub charts_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ModelArgs {
    #[arg(long, value_enum, default_value_t = StrategyArg::Arima)]
    pub strategy: StrategyArg,

    /// ARIMA order as `p,d,q`.
    #[arg(long, value_parser = parse_order)]
    pub order: Option<(usize, usize, usize)>,

    #[arg(long)]
    pub train_fraction: Option<f64>,

    /// Fit without a constant term.
    #[arg(long, default_value_t = false)]
    pub no_constant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Arima,
    Lstm,
}

fn parse_order(raw: &str) -> Result<(usize, usize, usize), String> {
    let parts = raw
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| format!("order must be three integers 'p,d,q': {err}"))?;
    match parts.as_slice() {
        [p, d, q] => Ok((*p, *d, *q)),
        _ => Err(format!("order must have three parts 'p,d,q', got {}", parts.len())),
    }
}
