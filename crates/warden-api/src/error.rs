//! API error handling
//!
//! One taxonomy for every expected failure the handlers produce. The two
//! 401 variants intentionally share a single wire body: the response must
//! not reveal whether authentication or authorization failed, nor which
//! sub-case of either occurred.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{AuthError, PasswordError, TokenError};

/// Wire shape for error responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error category
    pub error: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Missing/invalid/expired/stale credentials, or wrong email/password
    Authentication,
    /// Authenticated, but the role is not permitted for the operation
    Authorization,
    /// Malformed payload or no updatable fields supplied
    Validation(String),
    /// Duplicate email at registration; message stays ambiguous on purpose
    Conflict,
    /// An admin operation targeted a nonexistent account
    NotFound,
    /// Unexpected internal fault; detail is logged, not returned
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::Authentication | AppError::Authorization => (
                StatusCode::UNAUTHORIZED,
                ApiError::new("Unauthorised", "Invalid credentials."),
            ),
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, ApiError::new("Bad Request", message))
            }
            AppError::Conflict => (
                StatusCode::BAD_REQUEST,
                ApiError::new("Bad Request", "Registration failed."),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                ApiError::new("Not Found", "User does not exist."),
            ),
            AppError::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("Internal Server Error", "Internal server error."),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<warden_core::WardenError> for AppError {
    fn from(err: warden_core::WardenError) -> Self {
        use warden_core::WardenError;

        match err {
            WardenError::NotFound => AppError::NotFound,
            WardenError::DuplicateEmail => AppError::Conflict,
            WardenError::Database(msg) => AppError::Internal(msg),
            WardenError::Config(msg) => AppError::Internal(msg),
            WardenError::Other(err) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(msg) => AppError::Internal(msg),
            _ => AppError::Authentication,
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(msg) => AppError::Internal(msg),
            TokenError::SystemTime(e) => AppError::Internal(e.to_string()),
            _ => AppError::Authentication,
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
