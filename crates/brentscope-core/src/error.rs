use std::path::PathBuf;

use thiserror::Error;

/// Validation and contract errors exposed by `brentscope-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unrecognised date '{value}'")]
    InvalidDate { value: String },
    #[error("date window is empty: start {start} is after end {end}")]
    EmptyDateWindow { start: String, end: String },

    #[error("indicator code cannot be empty")]
    EmptyIndicatorCode,
    #[error("indicator list cannot be empty")]
    NoIndicators,

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("dates must be strictly increasing: {date} follows {previous}")]
    UnorderedDates { previous: String, date: String },

    #[error("column '{column}' not found, available columns: {available}")]
    UnknownColumn { column: String, available: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },
    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Failure while reading or writing a CSV dataset.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv '{path}': {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("csv '{path}' has no header row")]
    MissingHeader { path: PathBuf },

    #[error("csv '{path}' is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
