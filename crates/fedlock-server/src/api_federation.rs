//! Federation HTTP handlers.
//!
//! Routes under `/federation/*` are called by internal services; the
//! `/federation/remote/*` and `/api/v1/federation/*` routes receive relay
//! calls from peers and sit behind the checksum middleware.

use crate::api::ApiError;
use crate::AppState;
use axum::{http::StatusCode, Extension, Json};
use fedlock_crypto::Envelope;
use fedlock_types::{
    ContentPostObject, ContentRequest, FederationRecord, SrvTarget, UserKeyData,
    UserLookupRequest,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DomainRequest {
    pub domain: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoteUserRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    pub checksum: String,
    pub body: Value,
}

fn require(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::BadRequest(format!("{field} is required")))
    } else {
        Ok(())
    }
}

/// Handler for `POST /federation/content`.
pub async fn post_content_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(content): Json<ContentPostObject>,
) -> Result<Json<Value>, ApiError> {
    let response = state.engine.relay().post_content(&content, false).await?;
    Ok(Json(response))
}

/// Handler for `POST /federation/content/community`.
pub async fn post_community_content_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(content): Json<ContentPostObject>,
) -> Result<Json<Value>, ApiError> {
    let response = state.engine.relay().post_content(&content, true).await?;
    Ok(Json(response))
}

/// Handler for `POST /federation/content/request`.
pub async fn request_content_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ContentRequest>,
) -> Result<Json<Value>, ApiError> {
    let content = state
        .engine
        .relay()
        .request_content(&request.checksum, &request.domain)
        .await?;
    Ok(Json(content))
}

/// Handler for `POST /federation/remote/content` and
/// `POST /api/v1/federation/content`.
pub async fn receive_content_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(envelope): Json<Envelope>,
) -> Result<StatusCode, ApiError> {
    state.engine.inbound().handle_incoming_content(envelope).await?;
    Ok(StatusCode::OK)
}

/// Handler for `POST /federation/remote/deliver` and
/// `POST /api/v1/federation/deliver`.
pub async fn deliver_content_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ContentRequest>,
) -> Result<Json<Value>, ApiError> {
    let content = state
        .engine
        .inbound()
        .handle_incoming_content_request(&request.checksum, &request.domain)
        .await?;
    Ok(Json(content))
}

/// Handler for `POST /federation/user` and `POST /api/v1/federation/user`.
pub async fn user_keys_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<UserLookupRequest>,
) -> Result<Json<UserKeyData>, ApiError> {
    require(&request.encrypted_email, "encryptedEmail")?;
    let keys = state.engine.validator().get_user_information(&request).await?;
    Ok(Json(keys))
}

/// Handler for `POST /federation/lookup`: the raw SRV answer for a domain.
pub async fn lookup_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<DomainRequest>,
) -> Result<Json<Vec<SrvTarget>>, ApiError> {
    require(&request.domain, "domain")?;
    state
        .engine
        .discovery()
        .resolve_srv(&request.domain)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no federation service for {}", request.domain)))
}

/// Handler for `POST /federation/validate`.
pub async fn validate_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<ValidateRequest>,
) -> Result<StatusCode, ApiError> {
    require(&request.checksum, "checksum")?;
    state
        .engine
        .validator()
        .validate_incoming_federation_request(&request.checksum, &request.body)?;
    Ok(StatusCode::OK)
}

/// Handler for `POST /federation/init`: resolves and caches a domain.
pub async fn init_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<DomainRequest>,
) -> Result<Json<Vec<FederationRecord>>, ApiError> {
    require(&request.domain, "domain")?;
    let records = state.engine.discovery().resolve(&request.domain).await?;
    Ok(Json(records))
}

/// Handler for `POST /federation/remote`: public keys of a user on another
/// domain.
pub async fn remote_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<RemoteUserRequest>,
) -> Result<Json<UserKeyData>, ApiError> {
    require(&request.email, "email")?;
    let keys = state
        .engine
        .relay()
        .resolve_remote_user_keys(&request.email)
        .await?;
    Ok(Json(keys))
}
