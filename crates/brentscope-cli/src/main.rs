mod cli;
mod commands;
mod error;
mod metadata;
mod output;

use brentscope_core::Envelope;
use clap::Parser;
use serde_json::Value;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

/// Logs go to stderr so stdout stays a single envelope.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("brentscope=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();

    let envelope = commands::run(&cli).await?;
    output::render(&envelope, cli.format, cli.pretty)?;
    outcome(&envelope, cli.strict).map(ExitCode::from)
}

/// Exit 3 when a step failed; under `--strict` any warning or error is fatal.
fn outcome(envelope: &Envelope<Value>, strict: bool) -> Result<u8, CliError> {
    let warning_count = envelope.meta.warnings.len();
    let error_count = envelope.errors.len();
    if strict && warning_count + error_count > 0 {
        return Err(CliError::StrictModeViolation {
            warning_count,
            error_count,
        });
    }
    Ok(if error_count > 0 { 3 } else { 0 })
}
