//! Authentication of inbound federation requests.

use crate::collaborators::KeyService;
use crate::secrets::LocalSecrets;
use crate::FederationError;
use fedlock_crypto::{decrypt_value, verify_checksum};
use fedlock_types::{UserKeyData, UserLookupRequest};
use serde_json::Value;
use std::sync::Arc;

pub struct Validator {
    secrets: Arc<LocalSecrets>,
    keys: Arc<dyn KeyService>,
}

impl Validator {
    pub fn new(secrets: Arc<LocalSecrets>, keys: Arc<dyn KeyService>) -> Self {
        Self { secrets, keys }
    }

    /// Fails with [`FederationError::Authentication`] unless `checksum` is
    /// the checksum of `body`.
    pub fn validate_incoming_federation_request(
        &self,
        checksum: &str,
        body: &Value,
    ) -> Result<(), FederationError> {
        if verify_checksum(checksum, body) {
            Ok(())
        } else {
            tracing::warn!("rejected federation request with mismatching checksum");
            Err(FederationError::Authentication)
        }
    }

    /// Looks up the keys of a local user named in a peer's lookup request.
    ///
    /// Only the email is decrypted; the domain field is not used.
    pub async fn get_user_information(
        &self,
        request: &UserLookupRequest,
    ) -> Result<UserKeyData, FederationError> {
        let key = self.secrets.private_key().await?;
        let sealed = request.encrypted_email.clone();
        let email = tokio::task::spawn_blocking(move || {
            decrypt_value(&key, &sealed).map_err(FederationError::opening)
        })
        .await??;

        self.keys.load_users_key_by_email(&email).await.map_err(|e| {
            tracing::error!("user key lookup for federation failed: {}", e);
            FederationError::Lookup(e.to_string())
        })
    }
}
