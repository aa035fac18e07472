//! Server-level error type for handlers outside the feature slices

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::api::response::ErrorResponse;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        match err {
            crate::db::DbError::NotFound(msg) => AppError::NotFound(msg),
            crate::db::DbError::Duplicate(msg) => AppError::Validation(msg),
            crate::db::DbError::Config(msg) => AppError::Internal(msg),
            crate::db::DbError::Sqlx(err) => AppError::Database(err),
        }
    }
}

impl From<irradiance_common::IrradianceError> for AppError {
    fn from(err: irradiance_common::IrradianceError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Database(ref e) => {
                tracing::error!(error = ?e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "A database error occurred".to_string(),
                )
            },
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, "NOT_FOUND", message),
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message),
            AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message),
            AppError::Unavailable(message) => {
                (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE", message)
            },
            AppError::Internal(message) => {
                tracing::error!("Internal error: {}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            },
        };

        ErrorResponse::new(code, message).into_response_with(status)
    }
}

/// Alias for Result with AppError
pub type ApiResult<T> = Result<T, AppError>;
