// Error handling module for the accounts API
// Provides the boundary error type and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

use crate::auth::error::AuthError;

/// Main error type for the API
/// All handlers return Result<T, ApiError>
///
/// Every internal failure collapses into one of these variants before it reaches
/// the client, so a caller only ever observes 400, 401, 409 or 500.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed caller input
    /// Maps to HTTP 400 Bad Request
    BadRequest {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Any authentication failure
    /// Maps to HTTP 401 Unauthorized
    Unauthorized(String),

    /// Maps to HTTP 409 Conflict
    Conflict { message: String },

    /// Internal server errors
    /// Maps to HTTP 500 Internal Server Error
    /// The message is logged, never returned
    Internal(String),
}

/// Consistent error response structure
///
/// Machine-readable `error_code` plus a human-readable `message`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// e.g. "BAD_REQUEST", "UNAUTHORIZED"
    pub error_code: String,

    pub message: String,

    /// Field-level validation errors, when there are any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// RFC 3339 timestamp of when the error occurred
    pub timestamp: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
            details: None,
        }
    }

    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging levels follow severity: error! for 500s, warn! for authentication
    /// failures and conflicts, debug! for expected client errors.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let (error_code, message, details) = match self {
            ApiError::BadRequest { message, details } => {
                debug!("Bad request: {}", message);
                ("BAD_REQUEST", message.clone(), details.clone())
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized request: {}", message);
                ("UNAUTHORIZED", message.clone(), None)
            }
            ApiError::Conflict { message } => {
                warn!("Conflict error: {}", message);
                ("CONFLICT", message.clone(), None)
            }
            ApiError::Internal(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        (
            self.status_code(),
            ErrorResponse {
                error_code: error_code.to_string(),
                message,
                details,
                timestamp: Utc::now().to_rfc3339(),
            },
        )
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Collapse the internal authentication taxonomy at the HTTP boundary
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::WrongTokenType
            | AuthError::MissingToken
            | AuthError::UserNotFound
            | AuthError::InvalidCredentials
            | AuthError::OAuthRejected(_) => ApiError::Unauthorized(err.to_string()),

            AuthError::MalformedToken
            | AuthError::IncorrectPassword
            | AuthError::ValidationError(_)
            | AuthError::InvalidImage(_) => ApiError::bad_request(err.to_string()),

            AuthError::EmailAlreadyExists | AuthError::GoogleAccountAlreadyLinked => ApiError::Conflict {
                message: err.to_string(),
            },

            AuthError::OAuthUnavailable(_)
            | AuthError::DatabaseError(_)
            | AuthError::PasswordHashError
            | AuthError::TokenGenerationError(_)
            | AuthError::StorageError(_) => ApiError::Internal(err.to_string()),
        }
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::BadRequest {
            message: "Request validation failed".to_string(),
            details: Some(serde_json::to_value(&errors).unwrap_or(serde_json::json!({}))),
        }
    }
}
