//! Error taxonomy of the federation engine.

use fedlock_crypto::CryptoError;
use thiserror::Error;

/// Errors surfaced by discovery, relay, inbound handling and validation.
///
/// None of these are retried internally; every variant maps to a stable
/// machine-readable [`code`](FederationError::code).
#[derive(Debug, Error)]
pub enum FederationError {
    /// A required input field is missing or malformed.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The request checksum does not match its body.
    #[error("invalid federation checksum")]
    Authentication,

    /// The public federation directory could not be queried.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The peer has no usable public key or SRV entry.
    #[error("federation not possible: {0}")]
    Unavailable(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("decryption failed: {0}")]
    Decryption(String),

    /// An outbound call to a peer failed.
    #[error("{action}: {message}")]
    Relay { action: &'static str, message: String },

    /// An outbound call exceeded the configured timeout.
    #[error("{action}: request timed out")]
    Timeout { action: &'static str },

    /// The local content store rejected inbound content.
    #[error("cannot ingest content: {0}")]
    ContentIngest(String),

    /// The local content store could not load requested content.
    #[error("cannot load content: {0}")]
    ContentLookup(String),

    /// The key service could not load a user's keys.
    #[error("cannot load user keys: {0}")]
    Lookup(String),

    /// The federation cache backend failed.
    #[error("federation cache error: {0}")]
    Cache(String),

    /// A blocking worker task panicked or was cancelled.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl FederationError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Authentication => "AUTHENTICATION_ERROR",
            Self::Discovery(_) => "DISCOVERY_ERROR",
            Self::Unavailable(_) => "FEDERATION_UNAVAILABLE",
            Self::Encryption(_) => "ENCRYPTION_ERROR",
            Self::Decryption(_) => "DECRYPTION_ERROR",
            Self::Relay { .. } => "RELAY_ERROR",
            Self::Timeout { .. } => "TIMEOUT_ERROR",
            Self::ContentIngest(_) => "CONTENT_INGEST_ERROR",
            Self::ContentLookup(_) => "CONTENT_LOOKUP_ERROR",
            Self::Lookup(_) => "LOOKUP_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
            Self::Worker(_) => "INTERNAL_ERROR",
        }
    }

    /// Maps a failure while sealing an outbound envelope.
    pub(crate) fn sealing(err: CryptoError) -> Self {
        match err {
            CryptoError::Encryption(msg) => Self::Encryption(msg),
            CryptoError::Decryption(msg) => Self::Decryption(msg),
            CryptoError::Serialization(e) => Self::Encryption(e.to_string()),
        }
    }

    /// Maps a failure while opening an inbound envelope.
    pub(crate) fn opening(err: CryptoError) -> Self {
        match err {
            CryptoError::Encryption(msg) => Self::Encryption(msg),
            CryptoError::Decryption(msg) => Self::Decryption(msg),
            CryptoError::Serialization(e) => {
                Self::Validation(format!("decrypted payload is malformed: {e}"))
            }
        }
    }

    /// Maps a `reqwest` failure for the given action, keeping timeouts
    /// distinguishable from other transport failures.
    pub(crate) fn transport(action: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { action }
        } else {
            Self::Relay {
                action,
                message: err.to_string(),
            }
        }
    }
}

impl From<rusqlite::Error> for FederationError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<r2d2::Error> for FederationError {
    fn from(err: r2d2::Error) -> Self {
        Self::Cache(err.to_string())
    }
}

impl From<tokio::task::JoinError> for FederationError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Worker(err.to_string())
    }
}
