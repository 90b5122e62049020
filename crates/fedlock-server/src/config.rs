//! Server configuration loading from file and environment variables.

use fedlock_federation::{FederationSettings, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub federation: FederationConfig,

    /// Base URLs of the internal services the engine calls.
    #[serde(default)]
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// SQLite settings for the persistent federation cache.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "fedlock_federation=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

/// Where resolved federation records are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Timeout applied to every outbound federation HTTP call.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Scheme used to reach peers at their SRV target.
    #[serde(default = "default_scheme")]
    pub peer_scheme: String,

    /// Scheme used to reach the public federation directory.
    #[serde(default = "default_scheme")]
    pub directory_scheme: String,

    #[serde(default)]
    pub cache: CacheBackend,

    /// Age after which cached records are pruned. 0 keeps records forever.
    #[serde(default)]
    pub cache_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServicesConfig {
    #[serde(default = "default_license_url")]
    pub license_url: String,

    #[serde(default = "default_config_url")]
    pub config_url: String,

    #[serde(default = "default_content_url")]
    pub content_url: String,

    #[serde(default = "default_key_url")]
    pub key_url: String,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    8060
}

fn default_db_path() -> String {
    "fedlock.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_license_url() -> String {
    "http://127.0.0.1:8010".to_string()
}

fn default_config_url() -> String {
    "http://127.0.0.1:8020".to_string()
}

fn default_content_url() -> String {
    "http://127.0.0.1:8030".to_string()
}

fn default_key_url() -> String {
    "http://127.0.0.1:8040".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            peer_scheme: default_scheme(),
            directory_scheme: default_scheme(),
            cache: CacheBackend::default(),
            cache_ttl_seconds: 0,
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            license_url: default_license_url(),
            config_url: default_config_url(),
            content_url: default_content_url(),
            key_url: default_key_url(),
        }
    }
}

impl FederationConfig {
    /// The slice of configuration the engine sees.
    ///
    /// A `timeout_ms` of zero falls back to the engine default.
    pub fn settings(&self) -> FederationSettings {
        let timeout = if self.timeout_ms == 0 {
            tracing::warn!("federation.timeout_ms is 0, using the default timeout");
            DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(self.timeout_ms)
        };
        FederationSettings {
            timeout,
            peer_scheme: self.peer_scheme.clone(),
            directory_scheme: self.directory_scheme.clone(),
        }
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_seconds > 0).then(|| Duration::from_secs(self.cache_ttl_seconds))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `FEDLOCK_HOST` overrides `server.host`
/// - `FEDLOCK_PORT` overrides `server.port`
/// - `FEDLOCK_DB_PATH` overrides `database.path`
/// - `FEDLOCK_LOG_LEVEL` overrides `logging.level`
/// - `FEDLOCK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `FEDLOCK_FED_TIMEOUT_MS` overrides `federation.timeout_ms`
/// - `FEDLOCK_FED_SCHEME` overrides `federation.peer_scheme`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(parsed) = var("FEDLOCK_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = var("FEDLOCK_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(db_path) = var("FEDLOCK_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("FEDLOCK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("FEDLOCK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(parsed) = var("FEDLOCK_FED_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.federation.timeout_ms = parsed;
    }
    if let Some(scheme) = var("FEDLOCK_FED_SCHEME").filter(|s| !s.trim().is_empty()) {
        config.federation.peer_scheme = scheme;
    }
}
