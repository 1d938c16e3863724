use std::path::PathBuf;

use brentscope_core::TableError;
use thiserror::Error;

/// Errors raised by the EDA engine and its analyses.
#[derive(Debug, Error)]
pub enum EdaError {
    #[error("no data loaded, call load() first")]
    NotLoaded,

    #[error("dates are not formatted, call format_date() first")]
    NotFormatted,

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("{analysis} needs at least {needed} observations, got {actual}")]
    InsufficientData {
        analysis: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("{analysis}: {reason}")]
    Numerical {
        analysis: &'static str,
        reason: String,
    },

    #[error("failed to render chart '{path}': {reason}")]
    Chart { path: PathBuf, reason: String },
}

impl EdaError {
    pub(crate) fn insufficient(analysis: &'static str, needed: usize, actual: usize) -> Self {
        Self::InsufficientData {
            analysis,
            needed,
            actual,
        }
    }

    pub(crate) fn numerical(analysis: &'static str, reason: impl Into<String>) -> Self {
        Self::Numerical {
            analysis,
            reason: reason.into(),
        }
    }

    /// Short machine-readable code used in output envelopes.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotLoaded => "eda.not_loaded",
            Self::NotFormatted => "eda.not_formatted",
            Self::Table(_) => "eda.load_failed",
            Self::InsufficientData { .. } => "eda.insufficient_data",
            Self::InvalidParameter { .. } => "eda.invalid_parameter",
            Self::Numerical { .. } => "eda.numerical",
            Self::Chart { .. } => "eda.chart_failed",
        }
    }
}
