use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// HTTP status for a pipeline error code.
pub fn status_for_kind(kind: &str) -> StatusCode {
    match kind {
        "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
        "UNSUPPORTED_FORMAT" => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        "FETCH_ERROR" => StatusCode::BAD_GATEWAY,
        "EMPTY_DOCUMENT" => StatusCode::UNPROCESSABLE_ENTITY,
        "AUTH_ERROR" => StatusCode::UNAUTHORIZED,
        "RATE_LIMIT_ERROR" => StatusCode::TOO_MANY_REQUESTS,
        "MODEL_ERROR" | "EMPTY_RESPONSE" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Pipeline(e) => {
                let code = e.kind();
                let status = status_for_kind(code);
                if status.is_server_error() {
                    tracing::error!("Pipeline error [{code}]: {e}");
                } else {
                    tracing::warn!("Pipeline error [{code}]: {e}");
                }
                let message = if code == "RENDER_ERROR" {
                    "The enhanced CV could not be rendered".to_string()
                } else {
                    e.to_string()
                };
                (status, code, message)
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
