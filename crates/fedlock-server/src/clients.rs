//! HTTP clients for the internal license, config, content and key services.

use crate::config::ServicesConfig;
use async_trait::async_trait;
use fedlock_federation::{
    Collaborators, ConfigClient, ContentStore, KeyService, LicenseClient, ServiceError,
};
use fedlock_types::{ContentPostObject, FederationDirectoryConfig, UserKeyData};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PrivateKeyResponse {
    private_key: String,
}

#[derive(Deserialize)]
struct ChecksumResponse {
    checksum: String,
}

#[derive(Serialize)]
struct EmailQuery<'a> {
    email: &'a str,
}

/// Reaches every internal service over plain JSON HTTP.
pub struct HttpServices {
    http: reqwest::Client,
    urls: ServicesConfig,
}

impl HttpServices {
    pub fn new(urls: ServicesConfig, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, urls })
    }

    /// Wires one client into every collaborator slot of the engine.
    pub fn into_collaborators(self) -> Collaborators {
        let services = Arc::new(self);
        Collaborators {
            license: services.clone(),
            config: services.clone(),
            content: services.clone(),
            keys: services,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: String,
    ) -> Result<T, ServiceError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ServiceError::new(service, e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| ServiceError::new(service, e.to_string()))
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

#[async_trait]
impl LicenseClient for HttpServices {
    async fn private_key(&self) -> Result<String, ServiceError> {
        let body: PrivateKeyResponse = self
            .get("license", join(&self.urls.license_url, "license/key"))
            .await?;
        Ok(body.private_key)
    }

    async fn license_checksum(&self) -> Result<String, ServiceError> {
        let body: ChecksumResponse = self
            .get("license", join(&self.urls.license_url, "license/checksum"))
            .await?;
        Ok(body.checksum)
    }
}

#[async_trait]
impl ConfigClient for HttpServices {
    async fn federation_config(&self) -> Result<FederationDirectoryConfig, ServiceError> {
        self.get("config", join(&self.urls.config_url, "config/federation"))
            .await
    }
}

#[async_trait]
impl ContentStore for HttpServices {
    async fn create_content_from_federation(
        &self,
        content: &ContentPostObject,
    ) -> Result<(), ServiceError> {
        self.http
            .post(join(&self.urls.content_url, "content/federation"))
            .json(content)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ServiceError::new("content", e.to_string()))?;
        Ok(())
    }

    async fn load_content_from_federation(&self, checksum: &str) -> Result<Value, ServiceError> {
        self.get(
            "content",
            join(&self.urls.content_url, &format!("content/federation/{checksum}")),
        )
        .await
    }
}

#[async_trait]
impl KeyService for HttpServices {
    async fn load_users_key_by_email(&self, email: &str) -> Result<UserKeyData, ServiceError> {
        let response = self
            .http
            .get(join(&self.urls.key_url, "keys/user"))
            .query(&EmailQuery { email })
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ServiceError::new("key", e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| ServiceError::new("key", e.to_string()))
    }
}
