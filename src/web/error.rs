use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::model::ModelError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Invalid request body: {0}")]
    InvalidPayload(String),
    #[error("{0}")]
    Inference(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Client and server failures share one status; only the detail differs.
        let status = match self {
            AppError::Validation(_)
            | AppError::InvalidPayload(_)
            | AppError::Inference(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({ "detail": format!("Internal Server Error: {self}") })),
        )
            .into_response()
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::FeatureMismatch { .. } => AppError::Validation(err.to_string()),
            other => AppError::Inference(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidPayload(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Prediction task failed: {err}"))
    }
}
