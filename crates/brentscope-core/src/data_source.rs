//! Indicator source contract and request/error types.
//!
//! An [`IndicatorSource`] returns the annual observations of one indicator
//! inside an inclusive date window. The extraction pipeline fans out one
//! request per indicator and merges the results by date.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Indicator, ValidationError};

/// Extraction failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionErrorKind {
    /// Upstream could not be reached or answered with a transient failure.
    Unavailable,
    RateLimited,
    /// Upstream rejected the request (unknown indicator, bad window).
    Rejected,
    /// Response body did not have the expected shape.
    MalformedResponse,
    InvalidRequest,
    /// A pipeline step was called without its input.
    MissingInput,
    Io,
}

/// Structured error returned by every extraction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionError {
    kind: ExtractionErrorKind,
    message: String,
    retryable: bool,
}

impl ExtractionError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::Rejected,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::MalformedResponse,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn missing_input(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::MissingInput,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self {
            kind: ExtractionErrorKind::Io,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> ExtractionErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            ExtractionErrorKind::Unavailable => "extraction.unavailable",
            ExtractionErrorKind::RateLimited => "extraction.rate_limited",
            ExtractionErrorKind::Rejected => "extraction.rejected",
            ExtractionErrorKind::MalformedResponse => "extraction.malformed_response",
            ExtractionErrorKind::InvalidRequest => "extraction.invalid_request",
            ExtractionErrorKind::MissingInput => "extraction.missing_input",
            ExtractionErrorKind::Io => "extraction.io",
        }
    }
}

impl Display for ExtractionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for ExtractionError {}

impl From<ValidationError> for ExtractionError {
    fn from(value: ValidationError) -> Self {
        Self::invalid_request(value.to_string())
    }
}

impl From<crate::TableError> for ExtractionError {
    fn from(value: crate::TableError) -> Self {
        Self::io(value.to_string())
    }
}

/// Inclusive date window for an indicator request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::EmptyDateWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Calendar years touched by the window, as `(first, last)`.
    pub fn years(&self) -> (i32, i32) {
        (self.start.year(), self.end.year())
    }
}

/// Request for a single indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorRequest {
    pub indicator: Indicator,
    pub country: String,
    pub window: DateWindow,
}

impl IndicatorRequest {
    pub fn new(
        indicator: Indicator,
        country: impl Into<String>,
        window: DateWindow,
    ) -> Result<Self, ExtractionError> {
        let country = country.into();
        if country.trim().is_empty() {
            return Err(ExtractionError::invalid_request("country code must not be empty"));
        }
        Ok(Self {
            indicator,
            country: country.trim().to_ascii_uppercase(),
            window,
        })
    }
}

/// One dated value returned by a source. `None` when upstream has no value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Contract implemented by indicator providers.
pub trait IndicatorSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Observations of one indicator, any order, restricted to the window.
    fn observations<'a>(
        &'a self,
        request: IndicatorRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Observation>, ExtractionError>> + Send + 'a>>;
}
