mod correlate;
mod eda;
mod fetch;
mod model;

use std::fmt::Display;
use std::time::Instant;

use brentscope_core::{BrentscopeConfig, Envelope, EnvelopeError};
use serde_json::Value;
use tracing::info;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

/// Output of one command before it is wrapped in an envelope.
#[derive(Debug, Default)]
pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn push_error(&mut self, error: EnvelopeError) {
        self.errors.push(error);
    }

    #[cfg(test)]
    pub fn error_codes(&self) -> Vec<&str> {
        self.errors.iter().map(|error| error.code.as_str()).collect()
    }
}

/// Envelope error for a failed pipeline step.
pub(crate) fn step_error(code: &str, step: &str, err: impl Display) -> Result<EnvelopeError, CliError> {
    Ok(EnvelopeError::new(code, err.to_string())?.with_step(step))
}

pub fn load_config(cli: &Cli) -> Result<BrentscopeConfig, CliError> {
    let mut config = BrentscopeConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.data_dir {
        config.data.data_dir = dir.clone();
    }
    Ok(config)
}

pub async fn run(cli: &Cli) -> Result<Envelope<Value>, CliError> {
    let started = Instant::now();
    let config = load_config(cli)?;

    let command_result = match &cli.command {
        Command::Fetch(args) => fetch::run(args, &config).await?,
        Command::Eda(args) => eda::run(args, &config)?,
        Command::Correlate(args) => correlate::run(args, &config)?,
        Command::Model(args) => model::run(args, &config)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
    } = command_result;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        command = cli.command.name(),
        latency_ms,
        warnings = warnings.len(),
        errors = errors.len(),
        "command finished"
    );
    let mut metadata = Metadata::new(latency_ms);
    for warning in warnings {
        metadata.push_warning(warning);
    }
    let meta = metadata.into_envelope_meta()?;

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}
