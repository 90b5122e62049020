//! Outbound relay calls to peer domains.

use crate::discovery::Discovery;
use crate::settings::FederationSettings;
use crate::FederationError;
use fedlock_crypto::{checksum, seal, FederationPublicKey};
use fedlock_types::{
    ContentPostObject, ContentRequest, FederationRecord, KeyField, SrvTarget, UserKeyData,
    UserLookupRequest, FEDERATION_CHECKSUM_HEADER,
};
use serde_json::Value;
use std::sync::Arc;

const POST_CONTENT: &str = "can't post content";
const REQUEST_CONTENT: &str = "can't request content";
const USER_LOOKUP: &str = "federation request to target service failed";

/// Peer a relay call goes to: its public key and the SRV target to dial.
struct Peer {
    domain: String,
    public_key: String,
    target: SrvTarget,
}

/// Encrypts payloads for a peer and posts them to its federation endpoints.
///
/// Only the first record returned by discovery is used. No call is retried.
pub struct RelayClient {
    discovery: Arc<Discovery>,
    http: reqwest::Client,
    settings: FederationSettings,
}

impl RelayClient {
    pub fn new(discovery: Arc<Discovery>, http: reqwest::Client, settings: FederationSettings) -> Self {
        Self {
            discovery,
            http,
            settings,
        }
    }

    /// Relays a content reference to `content.domain`.
    ///
    /// A community system sends the key in chunks; a standalone peer sends
    /// an empty key.
    pub async fn post_content(
        &self,
        content: &ContentPostObject,
        as_community_system: bool,
    ) -> Result<Value, FederationError> {
        let domain = content
            .domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| FederationError::Validation("content domain is required".to_string()))?;
        let peer = self.peer_for(domain).await?;

        let mut payload = content.clone();
        payload.key = if as_community_system {
            KeyField::chunked(&content.key.joined())
        } else {
            KeyField::Single(String::new())
        };

        tracing::info!(
            domain = %peer.domain,
            community = as_community_system,
            "posting content to peer"
        );
        self.send(&peer, "content", &payload, POST_CONTENT).await
    }

    /// Asks the peer serving `domain` for the content identified by `checksum`.
    pub async fn request_content(&self, checksum: &str, domain: &str) -> Result<Value, FederationError> {
        if domain.trim().is_empty() {
            return Err(FederationError::Validation("domain is required".to_string()));
        }
        if checksum.trim().is_empty() {
            return Err(FederationError::Validation("checksum is required".to_string()));
        }
        let peer = self.peer_for(domain).await?;
        let request = ContentRequest {
            checksum: checksum.to_string(),
            domain: domain.to_string(),
        };
        tracing::info!(domain = %peer.domain, "requesting content from peer");
        self.send(&peer, "deliver", &request, REQUEST_CONTENT).await
    }

    /// Fetches the public key data of a user hosted on another domain.
    pub async fn resolve_remote_user_keys(&self, email: &str) -> Result<UserKeyData, FederationError> {
        let domain = email
            .rsplit_once('@')
            .map(|(_, host)| host.trim())
            .filter(|host| !host.is_empty())
            .ok_or_else(|| {
                FederationError::Validation("email must contain a domain part".to_string())
            })?;
        let peer = self.peer_for(domain).await?;
        let request = UserLookupRequest {
            encrypted_email: email.to_string(),
            encrypted_domain: domain.to_string(),
        };
        tracing::info!(domain = %peer.domain, "resolving remote user keys");
        self.send(&peer, "user", &request, USER_LOOKUP)
            .await
            .map(UserKeyData)
    }

    async fn peer_for(&self, domain: &str) -> Result<Peer, FederationError> {
        let records = self.discovery.resolve(domain).await?;
        let Some(record) = records.into_iter().next() else {
            return Err(FederationError::Unavailable(format!(
                "no federation record for {domain}"
            )));
        };
        peer_from_record(record)
    }

    async fn send<T: serde::Serialize>(
        &self,
        peer: &Peer,
        endpoint: &str,
        body: &T,
        action: &'static str,
    ) -> Result<Value, FederationError> {
        let plain = serde_json::to_value(body).map_err(|e| FederationError::Encryption(e.to_string()))?;
        let public_key = peer.public_key.clone();
        let (envelope, envelope_checksum) = tokio::task::spawn_blocking(move || {
            let key = FederationPublicKey::from_encoded(&public_key)
                .map_err(FederationError::sealing)?;
            let envelope = Value::Object(seal(&key, &plain).map_err(FederationError::sealing)?);
            let sum = checksum(&envelope);
            Ok::<_, FederationError>((envelope, sum))
        })
        .await??;

        let url = self.settings.peer_url(&peer.target, endpoint);
        let response = self
            .http
            .post(&url)
            .header(FEDERATION_CHECKSUM_HEADER, envelope_checksum)
            .json(&envelope)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                tracing::error!(domain = %peer.domain, url = %url, "{}: {}", action, e);
                FederationError::transport(action, e)
            })?;
        let text = response
            .text()
            .await
            .map_err(|e| FederationError::transport(action, e))?;
        Ok(parse_peer_body(text))
    }
}

fn peer_from_record(record: FederationRecord) -> Result<Peer, FederationError> {
    if record.public_key.trim().is_empty() {
        return Err(FederationError::Unavailable(format!(
            "{} has no federation public key",
            record.domain
        )));
    }
    let Some(target) = record.primary_target().cloned() else {
        return Err(FederationError::Unavailable(format!(
            "{} has no federation SRV target",
            record.domain
        )));
    };
    Ok(Peer {
        domain: record.domain,
        public_key: record.public_key,
        target,
    })
}

/// Peers answer with JSON, plain text or nothing.
fn parse_peer_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_without_key_is_unavailable() {
        let record = FederationRecord::new("peer.example", "", vec![SrvTarget::new("fed", 443)]);
        let err = peer_from_record(record).err().unwrap();
        assert!(matches!(err, FederationError::Unavailable(ref m) if m.contains("public key")));
    }

    #[test]
    fn record_without_srv_is_unavailable() {
        let record = FederationRecord::new("peer.example", "a2V5", Vec::new());
        let err = peer_from_record(record).err().unwrap();
        assert!(matches!(err, FederationError::Unavailable(ref m) if m.contains("SRV")));
    }

    #[test]
    fn peer_bodies_fall_back_to_text() {
        assert_eq!(parse_peer_body(r#"{"ok":true}"#.into()), json!({"ok": true}));
        assert_eq!(parse_peer_body("stored".into()), json!("stored"));
        assert_eq!(parse_peer_body(String::new()), Value::Null);
    }
}
