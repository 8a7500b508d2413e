use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use recap_ai::GenerationError;
use recap_types::dates::DateKeyError;
use recap_types::models::InvalidTag;

/// Application-level error type.
/// Implements `IntoResponse` so handlers can return `Result<T, AppError>`.
/// Every variant's message reaches the client unchanged.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::UsernameTaken | AppError::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Generation(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            AppError::Generation(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<InvalidTag> for AppError {
    fn from(e: InvalidTag) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<DateKeyError> for AppError {
    fn from(e: DateKeyError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self:?}");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
