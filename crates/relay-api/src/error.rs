//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints. TurnError is the failure side of one agent turn.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use relay_core::error::RelayError;
use relay_provider::ProviderError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "unauthorized").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 401 Unauthorized - missing, malformed or wrong bearer token.
    Unauthorized(String),
    /// 500 - the server has no bearer secret configured.
    Configuration(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Configuration(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

/// Why an agent turn did not complete.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    History(#[from] RelayError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl From<TurnError> for ApiError {
    fn from(err: TurnError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
