use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::models::InvoiceStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Invalid argument: {0}")]
    InvalidArgument(anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(anyhow::Error),

    #[error("Invalid transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: InvoiceStatus,
        to: InvoiceStatus,
    },

    #[error("Conflict: {0}")]
    Conflict(anyhow::Error),

    #[error("Upstream error: {0}")]
    UpstreamError(anyhow::Error),

    #[error("Store error: {0}")]
    StoreError(anyhow::Error),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::StoreError(anyhow::Error::new(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<String>,
            #[serde(skip_serializing_if = "std::ops::Not::not")]
            retryable: bool,
        }

        let (status, error_message, details, retryable) = match self {
            AppError::ValidationError(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation error".to_string(),
                Some(err.to_string()),
                false,
            ),
            AppError::InvalidArgument(err) => {
                (StatusCode::BAD_REQUEST, err.to_string(), None, false)
            }
            AppError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string(), None, false),
            AppError::Unauthorized(err) => (StatusCode::FORBIDDEN, err.to_string(), None, false),
            AppError::PreconditionFailed(err) => (
                StatusCode::PRECONDITION_FAILED,
                err.to_string(),
                None,
                false,
            ),
            AppError::InvalidTransition { from, to } => (
                StatusCode::CONFLICT,
                format!(
                    "Invalid invoice transition: {} -> {}",
                    from.as_str(),
                    to.as_str()
                ),
                None,
                false,
            ),
            // CAS exhaustion: the caller lost a race and may retry.
            AppError::Conflict(err) => (StatusCode::CONFLICT, err.to_string(), None, true),
            AppError::UpstreamError(err) => (
                StatusCode::BAD_GATEWAY,
                "Factoring provider error".to_string(),
                Some(err.to_string()),
                false,
            ),
            AppError::StoreError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Store error".to_string(),
                Some(err.to_string()),
                true,
            ),
            AppError::InternalError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                Some(format!("{:#?}", err)),
                false,
            ),
            AppError::ConfigError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Configuration error".to_string(),
                Some(err.to_string()),
                false,
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error: error_message,
                details,
                retryable,
            }),
        )
            .into_response()
    }
}
