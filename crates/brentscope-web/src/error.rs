use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Per-request failure, rendered as `500 {"error": ...}`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("dataset '{dataset}' is unavailable: {reason}")]
    DatasetUnavailable { dataset: &'static str, reason: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Server start-up failures.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("invalid CORS origin '{0}'")]
    InvalidOrigin(String),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}
