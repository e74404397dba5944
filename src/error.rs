// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why an authentication attempt was rejected.
///
/// Every kind renders as 401 at the boundary; the kind itself is kept for
/// logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No token was presented.
    MissingToken,
    /// Signature, algorithm or claim structure did not verify.
    InvalidToken,
    /// Token verified but its `exp` has passed.
    ExpiredToken,
    /// Login identifier matched no user.
    UserNotFound,
    /// Password did not match the stored digest.
    IncorrectPassword,
    /// Refresh token verified but is not the one currently stored.
    RefreshTokenMismatch,
}

impl AuthFailure {
    /// Message shown to the caller.
    ///
    /// Unknown identifier and wrong password share one message so responses
    /// do not reveal which accounts exist.
    pub fn public_message(self) -> &'static str {
        match self {
            AuthFailure::MissingToken => "unauthorized request",
            AuthFailure::InvalidToken => "invalid token",
            AuthFailure::ExpiredToken => "token expired",
            AuthFailure::UserNotFound | AuthFailure::IncorrectPassword => {
                "invalid user credentials"
            }
            AuthFailure::RefreshTokenMismatch => "refresh token is expired or used",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            AuthFailure::MissingToken => "missing token",
            AuthFailure::InvalidToken => "invalid token",
            AuthFailure::ExpiredToken => "expired token",
            AuthFailure::UserNotFound => "user not found",
            AuthFailure::IncorrectPassword => "incorrect password",
            AuthFailure::RefreshTokenMismatch => "refresh token expired or used",
        };
        f.write_str(kind)
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    Unauthorized(AuthFailure),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status this error renders with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The authentication failure kind, if this is a 401.
    pub fn auth_failure(&self) -> Option<AuthFailure> {
        match self {
            AppError::Unauthorized(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// JSON error envelope
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    status_code: u16,
    message: String,
    success: bool,
    errors: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Validation(msg) | AppError::Conflict(msg) | AppError::NotFound(msg) => {
                msg.clone()
            }
            AppError::Unauthorized(kind) => {
                tracing::debug!(reason = %kind, "Rejected unauthenticated request");
                kind.public_message().to_string()
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                "something went wrong".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "something went wrong".to_string()
            }
        };

        let body = ErrorResponse {
            status_code: status.as_u16(),
            message,
            success: false,
            errors: Vec::new(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
