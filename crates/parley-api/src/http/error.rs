//! Application error type mapping to HTTP status codes and a JSON body.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use parley_types::error::{RelayError, RepositoryError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// A required request parameter was absent or blank.
    MissingParameter(&'static str),
    /// Relay failure (always a store failure).
    Relay(RelayError),
    /// The request body could not be decoded.
    InvalidBody(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidBody(rejection.body_text())
    }
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        AppError::Relay(e)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, String, String) {
        match self {
            AppError::MissingParameter(name) => (
                StatusCode::BAD_REQUEST,
                format!("missing_{name}"),
                format!("{name} is required"),
            ),
            AppError::Relay(RelayError::Store(RepositoryError::InvalidArgument(msg))) => (
                StatusCode::BAD_REQUEST,
                "invalid_argument".to_string(),
                msg.clone(),
            ),
            AppError::Relay(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_failure".to_string(),
                e.to_string(),
            ),
            AppError::InvalidBody(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_body".to_string(),
                msg.clone(),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::error!(code = %code, "Request failed: {message}");
        }

        let body = json!({
            "error": code,
            "message": message,
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
