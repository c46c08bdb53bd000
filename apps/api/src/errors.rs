use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::matching::DocumentKind;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// A document had no usable text left after normalization. Recoverable:
    /// the caller is told which document failed and why.
    #[error("Empty input ({document}): {detail}")]
    EmptyInput {
        document: DocumentKind,
        detail: String,
    },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding provider error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The overall pipeline deadline expired. The request is abandoned;
    /// the core never retries on its own.
    #[error("Request timed out after {deadline_ms}ms")]
    Timeout { deadline_ms: u64 },

    /// Invalid weights or vocabulary. Only constructed at startup or when
    /// resolving per-request option overrides — never mid-pipeline.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::EmptyInput { document, detail } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EMPTY_INPUT",
                format!("No usable text in {document}: {detail}"),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Embedding(e) => {
                tracing::error!("Embedding provider error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMBEDDING_PROVIDER_ERROR",
                    e.to_string(),
                )
            }
            AppError::Timeout { deadline_ms } => {
                tracing::warn!("Match request timed out after {deadline_ms}ms");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "TIMEOUT",
                    format!("Request exceeded the {deadline_ms}ms deadline"),
                )
            }
            AppError::Configuration(msg) => {
                tracing::error!("Configuration error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIGURATION_ERROR",
                    msg.clone(),
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
