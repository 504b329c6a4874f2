//! API authentication via a shared bearer token.
//!
//! Every agent route sits behind [`require_auth`]. The configured secret is
//! checked before the request header so a misconfigured server never
//! reports a client-side auth failure.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ApiError;
use crate::state::AppState;

/// Why a request was not let through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No secret configured on the server.
    NotConfigured,
    /// Missing, malformed or mismatched credentials.
    Unauthorized(&'static str),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotConfigured => {
                ApiError::Configuration("API_BEARER_TOKEN environment variable not set".into())
            }
            AuthError::Unauthorized(msg) => ApiError::Unauthorized(msg.into()),
        }
    }
}

/// Check an `Authorization` header value against the expected secret.
///
/// The scheme must be exactly `Bearer` followed by one space. An empty
/// secret counts as unconfigured.
pub fn verify_bearer(presented: Option<&str>, expected: Option<&str>) -> Result<(), AuthError> {
    let expected = match expected {
        Some(secret) if !secret.is_empty() => secret,
        _ => return Err(AuthError::NotConfigured),
    };

    let header = presented.ok_or(AuthError::Unauthorized("Missing Authorization header"))?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Unauthorized("Invalid authentication scheme"))?;

    if token == expected {
        Ok(())
    } else {
        Err(AuthError::Unauthorized("Invalid authentication token"))
    }
}

/// Middleware that validates Bearer token authentication.
///
/// Returns 500 when the server has no secret and 401 when the credentials
/// are wrong. The wrapped handler is not invoked in either case.
pub async fn require_auth(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let presented = match req.headers().get(AUTHORIZATION).map(|v| v.to_str()) {
        Some(Ok(value)) => Some(value),
        Some(Err(_)) if state.api_token.is_some() => {
            return ApiError::Unauthorized("Invalid Authorization header encoding".into())
                .into_response();
        }
        Some(Err(_)) | None => None,
    };

    match verify_bearer(presented, state.api_token.as_deref()) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::warn!(path = %req.uri().path(), reason = ?err, "Rejected request");
            ApiError::from(err).into_response()
        }
    }
}
