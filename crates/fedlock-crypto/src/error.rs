//! Error types for envelope operations.

/// Errors raised while sealing or opening an envelope.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// A field could not be encrypted, or the public key is malformed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// A field could not be decrypted, or the private key is malformed or
    /// does not match the ciphertext.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The payload could not be converted to or from JSON.
    #[error("envelope serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
