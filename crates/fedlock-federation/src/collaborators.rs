//! Contracts of the internal services the engine calls.
//!
//! The engine never talks to the license, config, content or key services
//! directly; it is handed implementations of these traits at construction.

use async_trait::async_trait;
use fedlock_types::{ContentPostObject, FederationDirectoryConfig, UserKeyData};
use thiserror::Error;

/// A failed call to an internal service.
#[derive(Debug, Clone, Error)]
#[error("{service} service error: {message}")]
pub struct ServiceError {
    pub service: &'static str,
    pub message: String,
}

impl ServiceError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

/// License service: holds this node's private key and license checksum.
#[async_trait]
pub trait LicenseClient: Send + Sync {
    /// Base64-encoded PEM private key of this node.
    async fn private_key(&self) -> Result<String, ServiceError>;

    /// Checksum of this node's license, used to authenticate to the directory.
    async fn license_checksum(&self) -> Result<String, ServiceError>;
}

/// Config service: knows where the public federation directory lives.
#[async_trait]
pub trait ConfigClient: Send + Sync {
    async fn federation_config(&self) -> Result<FederationDirectoryConfig, ServiceError>;
}

/// Content service: local store for relayed content.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_content_from_federation(
        &self,
        content: &ContentPostObject,
    ) -> Result<(), ServiceError>;

    async fn load_content_from_federation(
        &self,
        checksum: &str,
    ) -> Result<serde_json::Value, ServiceError>;
}

/// Key service: public keys of local users.
#[async_trait]
pub trait KeyService: Send + Sync {
    async fn load_users_key_by_email(&self, email: &str) -> Result<UserKeyData, ServiceError>;
}
