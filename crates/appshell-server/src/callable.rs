//! Callable-function transport for `deleteUserByUid`.
//!
//! Requests arrive as `{"data": {...}}` and answers leave as
//! `{"result": {...}}`. Both success and failure results are HTTP 200; only
//! a body that is not a callable envelope is rejected with 400.

use std::sync::Arc;

use axum::{body::Bytes, extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use appshell_core::account::{DeletionRequest, DeletionResult};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CallableRequest {
    data: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallableResponse<T> {
    pub result: T,
}

fn parse_request(body: &[u8]) -> Result<DeletionRequest, AppError> {
    let envelope: CallableRequest =
        serde_json::from_slice(body).map_err(|e| AppError::MalformedPayload(e.to_string()))?;

    // A data value that is not an object carries no uid
    Ok(serde_json::from_value(envelope.data).unwrap_or_default())
}

pub async fn delete_user_by_uid(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<CallableResponse<DeletionResult>>, AppError> {
    let request = parse_request(&body)?;

    let _permit = state.limiter.acquire().await.map_err(|_| AppError::Unavailable)?;
    debug!(available = state.limiter.available_permits(), "Deletion permit acquired");

    let result = state.deletion.delete_user_by_uid(&request).await;
    Ok(Json(CallableResponse { result }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request() {
        let request = parse_request(br#"{"data": {"uid": "abc123"}}"#).unwrap();
        assert_eq!(request.valid_uid(), Some("abc123"));
    }

    #[test]
    fn test_parse_request_without_usable_data() {
        for body in [
            r#"{"data": null}"#,
            r#"{"data": {}}"#,
            r#"{"data": "abc123"}"#,
            r#"{"data": {"uid": 7}}"#,
        ] {
            let request = parse_request(body.as_bytes()).unwrap();
            assert_eq!(request.valid_uid(), None, "body: {}", body);
        }
    }

    #[test]
    fn test_parse_request_rejects_non_envelope() {
        assert!(matches!(
            parse_request(br#"{"uid": "abc123"}"#),
            Err(AppError::MalformedPayload(_))
        ));
        assert!(matches!(
            parse_request(b"not json"),
            Err(AppError::MalformedPayload(_))
        ));
    }
}
