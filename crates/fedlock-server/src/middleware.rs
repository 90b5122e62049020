//! Checksum authentication for relay calls from peers.

use crate::api::ApiError;
use crate::{AppState, MAX_REQUEST_BODY_BYTES};
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use fedlock_federation::FederationError;
use fedlock_types::FEDERATION_CHECKSUM_HEADER;
use serde_json::Value;
use std::sync::Arc;

/// Rejects the request with 403 unless `X-Federation-Checksum` matches the
/// checksum of the JSON body. The body is buffered and handed on unchanged.
pub async fn federation_checksum_middleware(
    req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let checksum = req
        .headers()
        .get(FEDERATION_CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or(ApiError::Federation(FederationError::Authentication))?;

    let state = req
        .extensions()
        .get::<Arc<AppState>>()
        .cloned()
        .ok_or_else(|| {
            ApiError::Federation(FederationError::Worker(
                "application state missing".to_string(),
            ))
        })?;

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES)
        .await
        .map_err(|e| ApiError::BadRequest(format!("unreadable request body: {e}")))?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::BadRequest(format!("request body is not JSON: {e}")))?;

    state
        .engine
        .validator()
        .validate_incoming_federation_request(&checksum, &value)?;

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
