//! API error types and handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Credential failures are deliberately uniform: a missing user, a wrong
    // password and a stale refresh hash all surface the same way so the API
    // cannot be used for account enumeration.
    #[error("Access denied")]
    AccessDenied,
    #[error("Invalid or expired magic link")]
    InvalidLink,
    #[error("Email already registered")]
    EmailAlreadyExists,
    #[error("Failed to send magic link")]
    MagicLinkDelivery,

    // Authorization errors
    #[error("Not authorized to perform this action")]
    Forbidden,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Invalid request: {0}")]
    BadRequest(String),

    // Internal errors
    #[error("Database error: {0}")]
    Database(String),
    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::AccessDenied => (StatusCode::UNAUTHORIZED, "ACCESS_DENIED", self.to_string()),
            ApiError::InvalidLink => (StatusCode::UNAUTHORIZED, "INVALID_LINK", self.to_string()),
            ApiError::EmailAlreadyExists => (StatusCode::CONFLICT, "EMAIL_EXISTS", self.to_string()),
            ApiError::MagicLinkDelivery => {
                (StatusCode::FORBIDDEN, "MAGIC_LINK_DELIVERY", self.to_string())
            }

            ApiError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", self.to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),

            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),

            ApiError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "Database error".to_string(),
            ),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", self.to_string()),
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    // PostgreSQL unique violation
                    if code == "23505" {
                        return ApiError::EmailAlreadyExists;
                    }
                }
                ApiError::Database(db_err.to_string())
            }
            _ => ApiError::Database(err.to_string()),
        }
    }
}

impl From<crate::store::StoreError> for ApiError {
    fn from(err: crate::store::StoreError) -> Self {
        use crate::store::StoreError;
        match err {
            StoreError::DuplicateEmail => ApiError::EmailAlreadyExists,
            StoreError::Database(msg) => {
                tracing::error!(error = %msg, "Record store error");
                ApiError::Database(msg)
            }
        }
    }
}

impl From<crate::auth::jwt::JwtError> for ApiError {
    fn from(err: crate::auth::jwt::JwtError) -> Self {
        use crate::auth::jwt::JwtError;
        match err {
            JwtError::Encoding(msg) => {
                tracing::error!(error = %msg, "Token encoding failed");
                ApiError::Internal
            }
            // Expired, malformed and mis-signed tokens all collapse into the
            // uniform credential failure.
            _ => ApiError::AccessDenied,
        }
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
