#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::pipeline::PipelineError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Pipeline(e) => {
                tracing::error!("Pipeline error: {e}");
                // The Display string already distinguishes "could not read
                // the document" from "nothing usable" from "could not be
                // understood" — surface it as-is.
                (pipeline_status(e), e.code(), e.to_string())
            }
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

fn pipeline_status(error: &PipelineError) -> StatusCode {
    match error {
        // The caller can fix these by sending a different document.
        PipelineError::Conversion(_) => StatusCode::UNPROCESSABLE_ENTITY,
        // The upstream inference service misbehaved.
        PipelineError::InferenceFailed(_)
        | PipelineError::EmptyInferenceResponse
        | PipelineError::Extraction(_) => StatusCode::BAD_GATEWAY,
        PipelineError::UploadFailed { .. } | PipelineError::StoreWriteFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
