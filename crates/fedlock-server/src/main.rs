//! fedlock server binary.
//!
//! Starts an axum HTTP server with structured logging, the federation
//! cache backend and graceful shutdown on SIGTERM/SIGINT.

use fedlock_federation::{
    DnsSrvResolver, FederationCache, FederationEngine, MemoryFederationCache,
    SqliteFederationCache,
};
use fedlock_server::clients::HttpServices;
use fedlock_server::config::{self, CacheBackend, Config};
use fedlock_server::{app, background, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("FEDLOCK_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

fn open_cache(config: &Config) -> Arc<dyn FederationCache> {
    let ttl = config.federation.cache_ttl();
    match config.federation.cache {
        CacheBackend::Memory => {
            tracing::info!("using in-memory federation cache");
            Arc::new(MemoryFederationCache::new(ttl))
        }
        CacheBackend::Sqlite => {
            let pool = fedlock_db::create_pool(
                &config.database.path,
                fedlock_db::DbRuntimeSettings {
                    busy_timeout_ms: config.database.busy_timeout_ms,
                    pool_max_size: config.database.pool_max_size,
                },
            )
            .expect("failed to create database pool; check database.path in config");

            {
                let conn = pool
                    .get()
                    .expect("failed to get database connection for migrations");
                let applied =
                    fedlock_db::run_migrations(&conn).expect("failed to run database migrations");
                if applied > 0 {
                    tracing::info!(count = applied, "applied database migrations");
                }
            }

            tracing::info!(path = %config.database.path, "using sqlite federation cache");
            Arc::new(SqliteFederationCache::new(pool, ttl))
        }
    }
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let settings = config.federation.settings();
    let cache = open_cache(&config);
    let services = HttpServices::new(config.services.clone(), settings.timeout)
        .expect("failed to build internal service client");
    let engine = FederationEngine::new(
        settings,
        services.into_collaborators(),
        cache.clone(),
        Arc::new(DnsSrvResolver::from_system_conf()),
    )
    .expect("failed to build federation engine");

    tokio::spawn(background::start_cache_prune_task(
        cache,
        config.federation.cache_ttl_seconds,
    ));

    let app = app(AppState { engine });
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting fedlock server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("fedlock server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
