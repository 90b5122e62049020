//! Content pushed to this domain by peers.

use crate::collaborators::ContentStore;
use crate::secrets::LocalSecrets;
use crate::FederationError;
use fedlock_crypto::{decrypt_value, open, Envelope};
use fedlock_types::{ContentPostObject, KeyField};
use serde_json::Value;
use std::sync::Arc;

/// Decrypts inbound relay payloads and hands them to the content store.
pub struct InboundHandler {
    secrets: Arc<LocalSecrets>,
    content: Arc<dyn ContentStore>,
}

impl InboundHandler {
    pub fn new(secrets: Arc<LocalSecrets>, content: Arc<dyn ContentStore>) -> Self {
        Self { secrets, content }
    }

    /// Decrypts a relayed content post and files it under the sending domain.
    ///
    /// A chunked key is rejoined before the post reaches the content store.
    pub async fn handle_incoming_content(&self, envelope: Envelope) -> Result<(), FederationError> {
        let key = self.secrets.private_key().await?;
        let mut post: ContentPostObject = tokio::task::spawn_blocking(move || {
            open(&key, &envelope).map_err(FederationError::opening)
        })
        .await??;

        let chunked = post.key.is_chunked();
        post.key = KeyField::Single(post.key.joined());
        post.domain = Some(post.sending_domain.clone());

        tracing::info!(
            sending_domain = %post.sending_domain,
            chunked,
            "ingesting federated content"
        );
        self.content
            .create_content_from_federation(&post)
            .await
            .map_err(|e| {
                tracing::error!(sending_domain = %post.sending_domain, "{}", e);
                FederationError::ContentIngest(e.to_string())
            })
    }

    /// Loads content a peer asked for.
    ///
    /// Only the checksum is decrypted; `domain` is carried along but not
    /// interpreted.
    pub async fn handle_incoming_content_request(
        &self,
        checksum: &str,
        domain: &str,
    ) -> Result<Value, FederationError> {
        let key = self.secrets.private_key().await?;
        let sealed = checksum.to_string();
        let checksum = tokio::task::spawn_blocking(move || {
            decrypt_value(&key, &sealed).map_err(FederationError::opening)
        })
        .await??;

        tracing::info!(has_domain = !domain.is_empty(), "serving federated content request");
        self.content
            .load_content_from_federation(&checksum)
            .await
            .map_err(|e| {
                tracing::error!("{}", e);
                FederationError::ContentLookup(e.to_string())
            })
    }
}
