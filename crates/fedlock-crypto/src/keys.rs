use crate::CryptoError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};

/// A peer's RSA public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FederationPublicKey(pub(crate) RsaPublicKey);

/// This node's RSA private key.
///
/// The inner key is zeroized on drop by the `rsa` crate.
#[derive(Clone)]
pub struct FederationPrivateKey(pub(crate) RsaPrivateKey);

impl std::fmt::Debug for FederationPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FederationPrivateKey(..)")
    }
}

/// Unwraps a base64-encoded PEM document. A bare PEM is accepted as is.
fn pem_text(encoded: &str) -> Result<String, String> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err("empty key".to_string());
    }
    if trimmed.starts_with("-----BEGIN") {
        return Ok(trimmed.to_string());
    }
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| format!("key is not valid base64: {e}"))?;
    String::from_utf8(bytes).map_err(|_| "key is not a PEM document".to_string())
}

impl FederationPublicKey {
    /// Parses a base64-encoded PEM public key (SPKI or PKCS#1).
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let pem = pem_text(encoded).map_err(CryptoError::Encryption)?;
        RsaPublicKey::from_public_key_pem(&pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(&pem))
            .map(Self)
            .map_err(|e| CryptoError::Encryption(format!("malformed public key: {e}")))
    }

    /// Returns the key as base64-encoded SPKI PEM, the form peers publish.
    pub fn to_encoded(&self) -> Result<String, CryptoError> {
        let pem = self
            .0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Encryption(format!("cannot encode public key: {e}")))?;
        Ok(STANDARD.encode(pem))
    }
}

impl FederationPrivateKey {
    /// Parses a base64-encoded PEM private key (PKCS#1 or PKCS#8).
    pub fn from_encoded(encoded: &str) -> Result<Self, CryptoError> {
        let pem = pem_text(encoded).map_err(CryptoError::Decryption)?;
        RsaPrivateKey::from_pkcs1_pem(&pem)
            .or_else(|_| RsaPrivateKey::from_pkcs8_pem(&pem))
            .map(Self)
            .map_err(|e| CryptoError::Decryption(format!("malformed private key: {e}")))
    }

    pub fn public_key(&self) -> FederationPublicKey {
        FederationPublicKey(self.0.to_public_key())
    }
}
