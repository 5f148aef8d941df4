// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use crate::models::validation::SERVER_ERROR_REASON;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Row store not connected (demo mode)")]
    DemoMode,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Vision model error: {0}")]
    ModelApi(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for errors caused by running without a configured backend.
    pub fn is_demo_mode(&self) -> bool {
        matches!(self, AppError::DemoMode)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details, reason) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None, None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None, None),
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, "not_found", Some(msg.clone()), None)
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()), None)
            }
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                None,
                None,
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                None,
                None,
            ),
            AppError::DemoMode => (
                StatusCode::SERVICE_UNAVAILABLE,
                "demo_mode",
                Some(self.to_string()),
                None,
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None, None)
            }
            AppError::ModelApi(msg) => {
                tracing::error!(error = %msg, "Validation error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "validation_failed",
                    None,
                    Some(SERVER_ERROR_REASON.to_string()),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None, None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
            reason,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers and client operations
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_mode_is_its_own_variant() {
        assert!(AppError::DemoMode.is_demo_mode());
        // A remote message that happens to mention demo mode is still a database error
        assert!(!AppError::Database("HTTP 500: demo mode disabled".to_string()).is_demo_mode());
        assert_eq!(
            AppError::DemoMode.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
