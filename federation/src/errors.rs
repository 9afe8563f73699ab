use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Errors that fail a whole federated search request
#[derive(Error, Debug)]
pub enum FederationError {
    #[error("At least one category must be 'biodiversity'.")]
    MissingBiodiversityCategory,

    #[error("At least one dataset must be requested.")]
    NoDatasets,

    #[error("At least one field must be requested.")]
    NoFields,

    #[error("Unknown datasets: {}", .0.join(", "))]
    UnknownDatasets(Vec<String>),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl FederationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FederationError::MissingBiodiversityCategory
            | FederationError::NoDatasets
            | FederationError::NoFields
            | FederationError::UnknownDatasets(_)
            | FederationError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            FederationError::HttpClient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for FederationError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "detail": self.to_string() }));
        (self.status_code(), body).into_response()
    }
}

/// Failure of a single participant call.
///
/// These never fail the search; they are reported inline next to the
/// (participant, field) pair they belong to.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("{participant} timed out after {timeout:?}")]
    Timeout {
        participant: String,
        timeout: Duration,
    },

    #[error("request to {participant} failed: {message}")]
    Transport {
        participant: String,
        message: String,
    },

    #[error("{participant} returned HTTP {status}")]
    Status { participant: String, status: u16 },

    #[error("invalid response body from {participant}: {message}")]
    InvalidBody {
        participant: String,
        message: String,
    },

    #[error("call to {participant} did not complete: {message}")]
    TaskFailed {
        participant: String,
        message: String,
    },
}

impl CallError {
    /// Short tag used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            CallError::Timeout { .. } => "timeout",
            CallError::Transport { .. } => "transport",
            CallError::Status { .. } => "status",
            CallError::InvalidBody { .. } => "invalid_body",
            CallError::TaskFailed { .. } => "task_failed",
        }
    }
}
