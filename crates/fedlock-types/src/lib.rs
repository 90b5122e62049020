//! Shared types and protocol constants for the fedlock federation engine.
//!
//! This crate holds the data that crosses crate boundaries: resolved peer
//! records, the content relay payloads exchanged between domains, and the
//! shapes returned by the public federation directory. It has no knowledge
//! of cryptography or transport; the engine in `fedlock-federation` owns
//! those concerns.

use serde::{Deserialize, Serialize};

mod content;
mod record;

pub use content::{build_key_chunks, ContentPostObject, ContentRequest, KeyField, UserLookupRequest};
pub use record::{
    DirectoryEntry, DirectoryPublicKey, DirectoryResponse, FederationDirectoryConfig,
    FederationRecord, SrvTarget,
};

/// DNS SRV service label queried for every federation peer.
pub const SRV_SERVICE: &str = "_2ndlock._tcp";

/// Directory alias for the shared community instance.
pub const COMMUNITY_DOMAIN: &str = "community.2ndlock.org";

/// Domain whose SRV records serve the community alias.
pub const COMMUNITY_SRV_DOMAIN: &str = "2ndlock.org";

/// Maximum number of characters carried by a single content key chunk.
///
/// Content keys are ASCII (base64 or hex key material). A full chunk of
/// ASCII, base64-encoded, fits a single RSA-4096 OAEP(SHA-512) block;
/// non-ASCII characters would overflow it.
pub const KEY_CHUNK_SIZE: usize = 250;

/// Header carrying the envelope checksum on peer-to-peer relay calls.
pub const FEDERATION_CHECKSUM_HEADER: &str = "X-Federation-Checksum";

/// Header carrying the local license checksum on directory calls.
pub const AUTH_KEY_HEADER: &str = "X-Auth-Key";

/// Header carrying the body checksum on directory calls.
pub const AUTH_CHECKSUM_HEADER: &str = "X-Auth-Checksum";

/// Returns the SRV query name for a domain (`_2ndlock._tcp.<domain>`).
pub fn srv_query_name(domain: &str) -> String {
    format!("{}.{}", SRV_SERVICE, domain.trim_end_matches('.'))
}

/// Public key payload returned for a local user by the key service.
///
/// The shape is owned by the key service; the engine only relays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserKeyData(pub serde_json::Value);
