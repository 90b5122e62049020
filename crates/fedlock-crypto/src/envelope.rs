use crate::{CryptoError, FederationPrivateKey, FederationPublicKey};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rsa::Oaep;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sha2::Sha512;

/// A JSON object whose fields are encrypted independently.
pub type Envelope = Map<String, Value>;

fn padding() -> Oaep {
    Oaep::new::<Sha512>()
}

/// Encrypts one plaintext value.
pub fn encrypt_value(key: &FederationPublicKey, plaintext: &str) -> Result<String, CryptoError> {
    let encoded = STANDARD.encode(plaintext.as_bytes());
    let ciphertext = key
        .0
        .encrypt(&mut rand::thread_rng(), padding(), encoded.as_bytes())
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;
    Ok(STANDARD.encode(ciphertext))
}

/// Decrypts one ciphertext value produced by [`encrypt_value`].
pub fn decrypt_value(key: &FederationPrivateKey, ciphertext: &str) -> Result<String, CryptoError> {
    let raw = STANDARD
        .decode(ciphertext.trim())
        .map_err(|e| CryptoError::Decryption(format!("ciphertext is not valid base64: {e}")))?;
    let encoded = key
        .0
        .decrypt(padding(), &raw)
        .map_err(|e| CryptoError::Decryption(e.to_string()))?;
    let plaintext = STANDARD
        .decode(&encoded)
        .map_err(|e| CryptoError::Decryption(format!("plaintext is not valid base64: {e}")))?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".to_string()))
}

fn scalar_text(name: &str, value: &Value) -> Result<String, CryptoError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(CryptoError::Encryption(format!(
            "field `{name}` is not a scalar or a list of scalars"
        ))),
    }
}

/// Encrypts every non-null field of `plain` under `key`.
///
/// Arrays are encrypted element by element; `null` fields and `null`
/// elements are left as they are.
pub fn encrypt_fields(key: &FederationPublicKey, plain: &Envelope) -> Result<Envelope, CryptoError> {
    let mut sealed = Map::with_capacity(plain.len());
    for (name, value) in plain {
        let encrypted = match value {
            Value::Null => Value::Null,
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Value::Null => Ok(Value::Null),
                        other => encrypt_value(key, &scalar_text(name, other)?).map(Value::String),
                    })
                    .collect::<Result<_, _>>()?,
            ),
            other => Value::String(encrypt_value(key, &scalar_text(name, other)?)?),
        };
        sealed.insert(name.clone(), encrypted);
    }
    Ok(sealed)
}

fn decrypt_item(key: &FederationPrivateKey, name: &str, value: &Value) -> Result<Value, CryptoError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::String(s) => decrypt_value(key, s).map(Value::String),
        _ => Err(CryptoError::Decryption(format!(
            "field `{name}` does not hold ciphertext"
        ))),
    }
}

/// Decrypts every non-null field of `sealed`. Decrypted values are strings.
pub fn decrypt_fields(key: &FederationPrivateKey, sealed: &Envelope) -> Result<Envelope, CryptoError> {
    let mut plain = Map::with_capacity(sealed.len());
    for (name, value) in sealed {
        let decrypted = match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| decrypt_item(key, name, item))
                    .collect::<Result<_, _>>()?,
            ),
            other => decrypt_item(key, name, other)?,
        };
        plain.insert(name.clone(), decrypted);
    }
    Ok(plain)
}

/// Serializes `body` to a JSON object and encrypts its fields.
pub fn seal<T: Serialize>(key: &FederationPublicKey, body: &T) -> Result<Envelope, CryptoError> {
    match serde_json::to_value(body)? {
        Value::Object(map) => encrypt_fields(key, &map),
        _ => Err(CryptoError::Encryption(
            "envelope body must be a JSON object".to_string(),
        )),
    }
}

/// Decrypts an envelope and deserializes the cleartext into `T`.
pub fn open<T: DeserializeOwned>(key: &FederationPrivateKey, sealed: &Envelope) -> Result<T, CryptoError> {
    let plain = decrypt_fields(key, sealed)?;
    Ok(serde_json::from_value(Value::Object(plain))?)
}
