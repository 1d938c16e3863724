use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("train fraction must be in (0, 1], got {0}")]
    InvalidFraction(f64),

    #[error("invalid model order: {0}")]
    InvalidOrder(String),

    #[error("{what} needs at least {needed} observations, got {actual}")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("{what} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("series contains non-finite values")]
    NonFinite,

    #[error("estimation failed: {0}")]
    Estimation(String),

    #[error("{0} forecasting is not implemented")]
    Unimplemented(&'static str),
}

impl ModelError {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidFraction(_) => "model.invalid_fraction",
            Self::InvalidOrder(_) => "model.invalid_order",
            Self::InsufficientData { .. } => "model.insufficient_data",
            Self::LengthMismatch { .. } => "model.length_mismatch",
            Self::NonFinite => "model.non_finite",
            Self::Estimation(_) => "model.estimation_failed",
            Self::Unimplemented(_) => "model.unimplemented",
        }
    }
}
