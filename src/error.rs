//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// Each variant maps to one HTTP status code. Variants that wrap internal
/// failures (database, provider calls) never leak their details to the
/// client; the details are logged instead.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (connection error, query error, ...).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// No session, an invalid session, or wrong credentials.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("{0}")]
    Unauthorized(&'static str),

    /// The resource exists but belongs to someone else.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("{0}")]
    Forbidden(&'static str),

    /// Requested resource does not exist (or is not visible to the caller).
    ///
    /// Returns HTTP 404 Not Found.
    #[error("{0}")]
    NotFound(&'static str),

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    #[error("{0}")]
    InvalidRequest(String),

    /// The write would violate a uniqueness rule or lost a race.
    ///
    /// Returns HTTP 409 Conflict.
    #[error("{0}")]
    Conflict(String),

    /// Too many attempts for the same key inside the limiter window.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Too many attempts, try again later")]
    RateLimited,

    /// A third-party provider call failed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Anything else that should never happen on a healthy deployment.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for building a validation error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        AppError::InvalidRequest(msg.into())
    }

    /// HTTP status, machine-readable code and client-facing message.
    ///
    /// Server-side failures collapse into one generic message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized", self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                self.to_string(),
            ),
            AppError::Database(_) | AppError::Upstream(_) | AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred".to_string(),
            ),
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// # Response Format
///
/// ```json
/// {
///   "error": "Human-readable error message",
///   "code": "error_type"
/// }
/// ```
///
/// # Status Code Mapping
///
/// - `Unauthorized` → 401
/// - `Forbidden` → 403
/// - `NotFound` → 404
/// - `InvalidRequest` → 400
/// - `Conflict` → 409
/// - `RateLimited` → 429
/// - `Database` / `Upstream` / `Internal` → 500 (details only in the logs)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::Upstream("square returned 502: secret body".into());
        let (status, code, message) = err.parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "internal_error");
        assert!(!message.contains("secret"));
    }

    #[test]
    fn client_errors_keep_their_message() {
        let (status, _, message) = AppError::invalid("Discount must be between 0 and 100").parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message, "Discount must be between 0 and 100");

        let (status, _, _) = AppError::RateLimited.parts();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
