//! Offline-first interception of every non-callable request.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::warn;

use appshell_core::offline::{FetchRequest, Resolution};

use crate::state::AppState;

/// Response header naming the strategy that answered.
pub const SOURCE_HEADER: &str = "x-appshell-source";

pub async fn intercept(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let url = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let request = FetchRequest::new(method.as_str(), url, body.to_vec());

    match state.offline.handle_fetch(&request).await {
        Ok(resolution) => into_response(resolution),
        Err(e) => {
            warn!(error = %e, "Request could not be served");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

fn into_response(resolution: Resolution) -> Response {
    let Resolution { response, served_by } = resolution;

    let mut builder = Response::builder()
        .status(StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY));

    for (name, value) in &response.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => builder = builder.header(name, value),
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }
    builder = builder.header(SOURCE_HEADER, served_by.to_string());

    match builder.body(Body::from(response.body)) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Failed to build response");
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
