//! Error handling for the certificate issuance service
//!
//! Every handler returns [`AppResult`]; collaborator layers keep their own
//! error enums and convert into [`AppError`] at the service boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::external::mail::MailError;
use crate::external::pdf::RenderError;
use crate::external::storage::StorageError;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    // Lookup and configuration errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Misconfigured: {0}")]
    Misconfigured(String),

    // Collaborator errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Export error: {0}")]
    Export(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<shared::models::InvalidColumn> for AppError {
    fn from(err: shared::models::InvalidColumn) -> Self {
        AppError::Misconfigured(err.to_string())
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Misconfigured(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("MISCONFIGURED", msg.clone()),
            ),
            AppError::Render(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("RENDER_ERROR", "The certificate could not be rendered"),
            ),
            AppError::Storage(StorageError::NotFound(_)) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", "File not found"),
            ),
            AppError::Storage(StorageError::InvalidHash(_)) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("INVALID_HASH", "Malformed file hash"),
            ),
            AppError::Storage(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorDetail::new("STORAGE_ERROR", "The file store is unavailable"),
            ),
            AppError::Mail(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorDetail::new("MAIL_ERROR", "The mail transport rejected the message"),
            ),
            AppError::Export(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("EXPORT_ERROR", format!("Export failed: {}", msg)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", msg.clone()),
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        let cases = [
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::InsufficientPermissions, StatusCode::FORBIDDEN),
            (AppError::validation("name", "required"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Certificate".into()), StatusCode::NOT_FOUND),
            (
                AppError::Misconfigured("Course is misconfigured".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Storage(StorageError::NotFound("abc".into())),
                StatusCode::NOT_FOUND,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
