//! HTTP surface of the fedlock federation engine.

pub mod api;
pub mod api_federation;
pub mod background;
pub mod clients;
pub mod config;
pub mod middleware;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use fedlock_federation::FederationEngine;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState {
    pub engine: FederationEngine,
}

/// Maximum request body size (2 MiB).
pub const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    // Relay calls from peers carry X-Federation-Checksum.
    let peer_routes = Router::new()
        .route(
            "/federation/remote/content",
            post(api_federation::receive_content_handler),
        )
        .route(
            "/federation/remote/deliver",
            post(api_federation::deliver_content_handler),
        )
        .route("/federation/user", post(api_federation::user_keys_handler))
        .route(
            "/api/v1/federation/content",
            post(api_federation::receive_content_handler),
        )
        .route(
            "/api/v1/federation/deliver",
            post(api_federation::deliver_content_handler),
        )
        .route(
            "/api/v1/federation/user",
            post(api_federation::user_keys_handler),
        )
        .layer(axum::middleware::from_fn(
            middleware::federation_checksum_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .route(
            "/federation/content",
            post(api_federation::post_content_handler),
        )
        .route(
            "/federation/content/community",
            post(api_federation::post_community_content_handler),
        )
        .route(
            "/federation/content/request",
            post(api_federation::request_content_handler),
        )
        .route("/federation/lookup", post(api_federation::lookup_handler))
        .route("/federation/validate", post(api_federation::validate_handler))
        .route("/federation/init", post(api_federation::init_handler))
        .route("/federation/remote", post(api_federation::remote_user_handler))
        .merge(peer_routes)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
