//! Error responses shared by all handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fedlock_federation::FederationError;
use serde_json::json;

/// Error returned by an HTTP handler.
///
/// Serialized as `{ "code": ..., "error": ... }`.
#[derive(Debug)]
pub enum ApiError {
    Federation(FederationError),
    BadRequest(String),
    NotFound(String),
}

impl From<FederationError> for ApiError {
    fn from(err: FederationError) -> Self {
        Self::Federation(err)
    }
}

fn federation_status(err: &FederationError) -> StatusCode {
    match err {
        FederationError::Authentication => StatusCode::FORBIDDEN,
        FederationError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        FederationError::Cache(_) | FederationError::Worker(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Federation(err) => (federation_status(&err), err.code(), err.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
        };

        if status.is_server_error() {
            tracing::error!(code, "{}", message);
        }

        let body = Json(json!({
            "code": code,
            "error": message
        }));

        (status, body).into_response()
    }
}
