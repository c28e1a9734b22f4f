//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use generator_lib::{FieldError, GeneratorError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("request body exceeds the {0} byte limit")]
    PayloadTooLarge(usize),

    #[error("request failed validation ({} errors)", .0.len())]
    Validation(Vec<FieldError>),

    #[error(transparent)]
    Generation(#[from] GeneratorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidJson(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "error": "Invalid JSON body",
                    "details": details,
                })),
            )
                .into_response(),
            ApiError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({
                    "success": false,
                    "error": format!("Request body exceeds {} bytes", limit),
                })),
            )
                .into_response(),
            ApiError::Validation(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "success": false,
                    "error": "Validation failed",
                    "details": details,
                })),
            )
                .into_response(),
            ApiError::Generation(err) => {
                error!(error = %err, "Generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "error": "Internal server error",
                    })),
                )
                    .into_response()
            }
        }
    }
}
