//! Resolution of a domain into federation records.
//!
//! A lookup is cache-first. On a miss the engine asks the public federation
//! directory which peers serve the domain, looks up each peer's SRV record,
//! caches the result and returns it.

use crate::cache::FederationCache;
use crate::secrets::LocalSecrets;
use crate::settings::FederationSettings;
use crate::FederationError;
use async_trait::async_trait;
use fedlock_crypto::{checksum, seal, FederationPublicKey};
use fedlock_types::{
    srv_query_name, DirectoryEntry, DirectoryPublicKey, DirectoryResponse, FederationRecord,
    SrvTarget, AUTH_CHECKSUM_HEADER, AUTH_KEY_HEADER, COMMUNITY_DOMAIN, COMMUNITY_SRV_DOMAIN,
};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use serde_json::{json, Value};
use std::sync::Arc;

/// A failed SRV lookup.
#[derive(Debug, thiserror::Error)]
#[error("SRV lookup for {name} failed: {message}")]
pub struct SrvLookupError {
    pub name: String,
    pub message: String,
}

/// DNS SRV lookups.
#[async_trait]
pub trait SrvResolver: Send + Sync {
    /// Looks up SRV records for a fully assembled query name.
    async fn lookup_srv(&self, name: &str) -> Result<Vec<SrvTarget>, SrvLookupError>;
}

/// [`SrvResolver`] backed by the system's DNS configuration.
pub struct DnsSrvResolver {
    resolver: TokioAsyncResolver,
}

impl DnsSrvResolver {
    /// Uses `/etc/resolv.conf` (or the platform equivalent), falling back to
    /// the resolver library's defaults when it cannot be read.
    pub fn from_system_conf() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            tracing::warn!("system DNS configuration unavailable, using defaults: {}", e);
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

#[async_trait]
impl SrvResolver for DnsSrvResolver {
    async fn lookup_srv(&self, name: &str) -> Result<Vec<SrvTarget>, SrvLookupError> {
        let lookup = self
            .resolver
            .srv_lookup(name)
            .await
            .map_err(|e| SrvLookupError {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(lookup
            .iter()
            .map(|srv| SrvTarget {
                target: srv.target().to_utf8(),
                port: srv.port(),
                priority: srv.priority(),
                weight: srv.weight(),
            })
            .collect())
    }
}

/// Domain resolution against cache, directory and DNS.
pub struct Discovery {
    cache: Arc<dyn FederationCache>,
    resolver: Arc<dyn SrvResolver>,
    secrets: Arc<LocalSecrets>,
    http: reqwest::Client,
    settings: FederationSettings,
}

const DIRECTORY_ACTION: &str = "can't load domain information from public federation service";
const DIRECTORY_KEY_ACTION: &str = "can't load public key from public federation service";

impl Discovery {
    pub fn new(
        cache: Arc<dyn FederationCache>,
        resolver: Arc<dyn SrvResolver>,
        secrets: Arc<LocalSecrets>,
        http: reqwest::Client,
        settings: FederationSettings,
    ) -> Self {
        Self {
            cache,
            resolver,
            secrets,
            http,
            settings,
        }
    }

    /// SRV targets of `_2ndlock._tcp.<domain>`, or `None` when the lookup
    /// fails. A failed lookup means "no federation endpoint", not a fault.
    pub async fn resolve_srv(&self, domain: &str) -> Option<Vec<SrvTarget>> {
        match self.resolver.lookup_srv(&srv_query_name(domain)).await {
            Ok(targets) => Some(targets),
            Err(e) => {
                tracing::warn!(domain, "{}", e);
                None
            }
        }
    }

    /// Federation records for `domain`, from cache or from the directory.
    ///
    /// Candidates without an SRV answer are dropped. When any candidate has
    /// both a public key and an SRV target, only those are cached and
    /// returned. Otherwise the unusable candidates are returned uncached so
    /// the caller can report what is missing.
    pub async fn resolve(&self, domain: &str) -> Result<Vec<FederationRecord>, FederationError> {
        let cached = self.cache.get(domain).await;
        if !cached.is_empty() {
            tracing::debug!(domain, count = cached.len(), "federation cache hit");
            return Ok(cached);
        }

        tracing::info!(domain, "resolving federation records via directory");
        let entries = self.query_directory(domain).await?;
        let (usable, unusable): (Vec<_>, Vec<_>) = self
            .records_from_entries(entries)
            .await
            .into_iter()
            .partition(FederationRecord::is_usable);

        for record in &unusable {
            tracing::warn!(
                domain,
                peer = %record.domain,
                "federation record lacks a public key or SRV target"
            );
        }
        if usable.is_empty() {
            return Ok(unusable);
        }

        for record in &usable {
            if let Err(e) = self.cache.set(domain, record.clone()).await {
                tracing::warn!(domain, peer = %record.domain, "failed to cache federation record: {}", e);
            }
        }

        tracing::info!(domain, count = usable.len(), "resolved federation records");
        Ok(usable)
    }

    /// Fetches the directory's own public key.
    async fn directory_public_key(
        &self,
        host: &str,
        license_checksum: &str,
    ) -> Result<String, FederationError> {
        let response = self
            .http
            .get(self.settings.directory_url(host, "publickey"))
            .header(AUTH_KEY_HEADER, license_checksum)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| directory_failure(DIRECTORY_KEY_ACTION, e))?;
        let body: DirectoryPublicKey = response
            .json()
            .await
            .map_err(|e| directory_failure(DIRECTORY_KEY_ACTION, e))?;
        Ok(body.publickey)
    }

    /// Asks the directory which peers serve `domain`.
    async fn query_directory(&self, domain: &str) -> Result<Vec<DirectoryEntry>, FederationError> {
        let license_checksum = self.secrets.license_checksum().await?;
        let directory = self.secrets.directory().await?;
        let host = directory.public_federation_service;
        let directory_key = self.directory_public_key(&host, &license_checksum).await?;

        let domain_owned = domain.to_string();
        let body = tokio::task::spawn_blocking(move || {
            let key = FederationPublicKey::from_encoded(&directory_key)
                .map_err(FederationError::sealing)?;
            seal(&key, &json!({ "domain": domain_owned })).map_err(FederationError::sealing)
        })
        .await??;
        let body = Value::Object(body);
        let body_checksum = checksum(&body);

        let response = self
            .http
            .post(self.settings.directory_url(&host, "federation"))
            .header(AUTH_KEY_HEADER, &license_checksum)
            .header(AUTH_CHECKSUM_HEADER, &body_checksum)
            .json(&body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| directory_failure(DIRECTORY_ACTION, e))?;
        let parsed: DirectoryResponse = response
            .json()
            .await
            .map_err(|e| directory_failure(DIRECTORY_ACTION, e))?;
        Ok(parsed.into_entries())
    }

    async fn records_from_entries(&self, entries: Vec<DirectoryEntry>) -> Vec<FederationRecord> {
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let srv_domain = if entry.domain == COMMUNITY_DOMAIN {
                COMMUNITY_SRV_DOMAIN
            } else {
                entry.domain.as_str()
            };
            if let Some(srv) = self.resolve_srv(srv_domain).await {
                records.push(FederationRecord::new(entry.domain, entry.public_key, srv));
            }
        }
        records
    }
}

fn directory_failure(action: &'static str, err: reqwest::Error) -> FederationError {
    tracing::error!("{}: {}", action, err);
    match FederationError::transport(action, err) {
        timeout @ FederationError::Timeout { .. } => timeout,
        other => FederationError::Discovery(other.to_string()),
    }
}
