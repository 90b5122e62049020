//! Federation protocol engine.
//!
//! Domains find each other through a public federation directory and DNS
//! SRV records, then exchange content references inside field-encrypted
//! envelopes stamped with a checksum. This crate owns every step of that
//! exchange: resolving and caching peers ([`Discovery`], [`FederationCache`]),
//! relaying content to peers ([`RelayClient`]), and accepting content from
//! peers ([`Validator`], [`InboundHandler`]).
//!
//! The internal license, config, content and key services are reached
//! through the traits in [`collaborators`]; the engine does not know how
//! they are implemented.

pub mod cache;
pub mod collaborators;
pub mod discovery;
pub mod error;
pub mod inbound;
pub mod relay;
pub mod secrets;
pub mod settings;
pub mod validator;

pub use cache::{FederationCache, MemoryFederationCache, SqliteFederationCache};
pub use collaborators::{ConfigClient, ContentStore, KeyService, LicenseClient, ServiceError};
pub use discovery::{Discovery, DnsSrvResolver, SrvLookupError, SrvResolver};
pub use error::FederationError;
pub use inbound::InboundHandler;
pub use relay::RelayClient;
pub use secrets::LocalSecrets;
pub use settings::{FederationSettings, DEFAULT_TIMEOUT};
pub use validator::Validator;

use std::sync::Arc;

/// Implementations of the internal services the engine depends on.
#[derive(Clone)]
pub struct Collaborators {
    pub license: Arc<dyn LicenseClient>,
    pub config: Arc<dyn ConfigClient>,
    pub content: Arc<dyn ContentStore>,
    pub keys: Arc<dyn KeyService>,
}

/// The engine's components, wired to one shared cache, resolver and set of
/// local secrets.
pub struct FederationEngine {
    cache: Arc<dyn FederationCache>,
    discovery: Arc<Discovery>,
    relay: RelayClient,
    inbound: InboundHandler,
    validator: Validator,
}

impl FederationEngine {
    pub fn new(
        settings: FederationSettings,
        collaborators: Collaborators,
        cache: Arc<dyn FederationCache>,
        resolver: Arc<dyn SrvResolver>,
    ) -> Result<Self, FederationError> {
        let http = settings
            .http_client()
            .map_err(|e| FederationError::Relay {
                action: "can't build federation HTTP client",
                message: e.to_string(),
            })?;
        let secrets = Arc::new(LocalSecrets::new(
            collaborators.license,
            collaborators.config,
        ));
        let discovery = Arc::new(Discovery::new(
            cache.clone(),
            resolver,
            secrets.clone(),
            http.clone(),
            settings.clone(),
        ));
        Ok(Self {
            cache,
            relay: RelayClient::new(discovery.clone(), http, settings),
            inbound: InboundHandler::new(secrets.clone(), collaborators.content),
            validator: Validator::new(secrets, collaborators.keys),
            discovery,
        })
    }

    pub fn cache(&self) -> &Arc<dyn FederationCache> {
        &self.cache
    }

    pub fn discovery(&self) -> &Discovery {
        &self.discovery
    }

    pub fn relay(&self) -> &RelayClient {
        &self.relay
    }

    pub fn inbound(&self) -> &InboundHandler {
        &self.inbound
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }
}
