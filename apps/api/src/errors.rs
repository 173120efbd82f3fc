#![allow(dead_code)]

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::parser::ParseError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Model output unusable: {0}")]
    Parse(#[from] ParseError),

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
            AppError::Gateway(GatewayError::AllModelsOverloaded { attempted }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MODELS_OVERLOADED",
                format!(
                    "All AI models are currently unavailable (tried: {}). Please retry shortly.",
                    attempted.join(", ")
                ),
            ),
            AppError::Gateway(e) => {
                // Auth, quota and malformed-request failures are operator
                // problems; the client only learns the provider is down.
                tracing::error!("Model gateway error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MODEL_PROVIDER_ERROR",
                    "The AI provider rejected the request".to_string(),
                )
            }
            AppError::Parse(e) => {
                tracing::error!("Unusable model output: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "MODEL_OUTPUT_UNUSABLE",
                    "The AI reply could not be interpreted".to_string(),
                )
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
