use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::documents::ExtractError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// Regenerate requested before any generation completed.
    #[error("{0}")]
    CacheMiss(String),

    #[error(transparent)]
    UnsupportedDocument(ExtractError),

    #[error("Agent unavailable: {0}")]
    AgentUnavailable(String),

    #[error("{0}")]
    Timeout(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractError> for AppError {
    fn from(e: ExtractError) -> Self {
        match e {
            ExtractError::Worker(join) => {
                AppError::Internal(anyhow::Error::new(join).context("document worker failed"))
            }
            other => AppError::UnsupportedDocument(other),
        }
    }
}

/// Malformed or mistyped JSON bodies render through the usual envelope.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::CacheMiss(msg) => {
                (StatusCode::BAD_REQUEST, "NO_CACHED_INSIGHTS", msg.clone())
            }
            AppError::UnsupportedDocument(e) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_DOCUMENT", e.to_string())
            }
            AppError::AgentUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "AGENT_UNAVAILABLE",
                self.to_string(),
            ),
            AppError::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT", msg.clone()),
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (StatusCode::BAD_GATEWAY, "LLM_ERROR", self.to_string())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
