//! Error types for web handlers.
//!
//! This module maps identity directory errors and handshake rejections to
//! HTTP responses, implementing Axum's `IntoResponse` trait.

use crate::handshake::RejectReason;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use socialapp_auth::AuthError;
use std::fmt;

/// Application error type for web handlers.
///
/// This type wraps domain errors and provides HTTP-friendly error responses.
/// It implements Axum's `IntoResponse` trait to automatically convert errors
/// into HTTP responses.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState<K, S>>) -> Result<Json<Body>, AppError> {
///     let identity = state.directory.find_one(provider, &query).await?;
///     Ok(Json(body))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            message.into(),
            "BAD_REQUEST".to_string(),
        )
    }

    /// Create a 409 Conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            message.into(),
            "CONFLICT".to_string(),
        )
    }

    /// Create a 401 error for a refused handshake.
    #[must_use]
    pub fn handshake_rejected(reason: RejectReason) -> Self {
        let code = match reason {
            RejectReason::MalformedCredential => "MALFORMED_CREDENTIAL",
            RejectReason::SessionNotFound => "SESSION_NOT_FOUND",
        };
        Self::new(
            StatusCode::UNAUTHORIZED,
            reason.message().to_string(),
            code.to_string(),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            "INTERNAL_SERVER_ERROR".to_string(),
        )
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            message.into(),
            "SERVICE_UNAVAILABLE".to_string(),
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log internal errors
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

/// Convert directory errors by class; integrity details stay server-side.
impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let base = if err.is_transient() {
            Self::unavailable("Identity store temporarily unavailable")
        } else if err.is_invalid_input() {
            Self::bad_request(err.to_string())
        } else if matches!(err, AuthError::IdentityExists { .. }) {
            Self::conflict(err.to_string())
        } else {
            Self::internal("An internal error occurred")
        };
        base.with_source(anyhow::Error::new(err))
    }
}
