//! API error type and HTTP status mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

/// Errors surfaced to HTTP clients as `{"error": message}` bodies.
#[derive(Debug)]
pub enum ApiError {
    Internal(cnote_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    /// Upstream model service failure.
    Upstream(String),
}

impl From<cnote_core::Error> for ApiError {
    fn from(err: cnote_core::Error) -> Self {
        match err {
            cnote_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            cnote_core::Error::NoteNotFound(id) => {
                ApiError::NotFound(format!("Note not found: {}", id))
            }
            cnote_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            cnote_core::Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            cnote_core::Error::Embedding(msg) | cnote_core::Error::Inference(msg) => {
                ApiError::Upstream(msg)
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                tracing::error!(error = %err, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
