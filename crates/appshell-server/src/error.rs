use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Transport-level failures of the callable protocol.
///
/// Deletion outcomes are never errors here; they travel inside the result.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Service unavailable")]
    Unavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match self {
            AppError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            AppError::Unavailable => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
        };

        let body = json!({
            "error": {
                "status": code,
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}
