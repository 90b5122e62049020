//! Cryptographic envelope for cross-domain federation messages.
//!
//! Every field of an outbound payload is encrypted on its own under the
//! receiving peer's RSA public key (OAEP with SHA-512), and a checksum is
//! computed over the encrypted result. The receiver verifies the checksum
//! before decrypting anything with its private key.
//!
//! # Wire format
//!
//! - Keys travel as base64-encoded PEM documents.
//! - Each field's plaintext is base64-encoded before encryption and the
//!   ciphertext is base64-encoded again for transport.
//! - Array fields are encrypted element by element with the same key.
//! - `null` fields pass through untouched in both directions.
//! - The checksum is the lowercase hex SHA-256 of the envelope's canonical
//!   JSON serialization (object keys sorted, no whitespace).

mod checksum;
mod envelope;
mod error;
mod keys;

#[cfg(any(test, feature = "test-keys"))]
pub mod test_keys;

pub use checksum::{canonical_json, checksum, verify_checksum};
pub use envelope::{decrypt_fields, decrypt_value, encrypt_fields, encrypt_value, open, seal, Envelope};
pub use error::CryptoError;
pub use keys::{FederationPrivateKey, FederationPublicKey};
