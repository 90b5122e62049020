use crate::KEY_CHUNK_SIZE;
use serde::{de, Deserialize, Deserializer, Serialize};

/// The content decryption key as carried by a relay payload.
///
/// Community systems split the key into [`KEY_CHUNK_SIZE`] chunks so each
/// chunk fits one RSA block; standalone peers send a single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyField {
    Single(String),
    Chunked(Vec<String>),
}

impl KeyField {
    /// Splits `key` into transport chunks.
    pub fn chunked(key: &str) -> Self {
        Self::Chunked(build_key_chunks(key))
    }

    /// Rejoins a chunked key by concatenation.
    pub fn joined(&self) -> String {
        match self {
            Self::Single(key) => key.clone(),
            Self::Chunked(chunks) => chunks.concat(),
        }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked(_))
    }
}

impl Default for KeyField {
    fn default() -> Self {
        Self::Single(String::new())
    }
}

/// Splits a key into chunks of at most [`KEY_CHUNK_SIZE`] characters.
///
/// Every chunk but the last is exactly `KEY_CHUNK_SIZE` characters long.
/// An empty key yields no chunks. Only ASCII keys produce chunks that can
/// be sealed for relay.
pub fn build_key_chunks(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    chars
        .chunks(KEY_CHUNK_SIZE)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Content reference relayed from one domain to another.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPostObject {
    /// Checksum identifying the content in the sender's content store.
    pub checksum: String,
    #[serde(default)]
    pub key: KeyField,
    /// Target domain on the way out; rewritten to the sender on the way in.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub sending_domain: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub live_time: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub max_open: Option<i64>,
}

/// Request for content held by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    pub checksum: String,
    pub domain: String,
}

/// Remote user key lookup.
///
/// The field names are historical: the sender fills them with plaintext and
/// the envelope step encrypts them. Gateways that forward the request under
/// `email`/`domain` are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLookupRequest {
    #[serde(alias = "email")]
    pub encrypted_email: String,
    #[serde(alias = "domain", default)]
    pub encrypted_domain: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrText {
    Int(i64),
    Text(String),
}

// Decrypted envelopes carry numbers as decimal text.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntOrText::Int(n)) => Ok(Some(n)),
        Some(IntOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(IntOrText::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("expected an integer, got {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_rejoin_to_input() {
        let key: String = (0..600).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let chunks = build_key_chunks(&key);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), KEY_CHUNK_SIZE);
        assert_eq!(chunks[1].len(), KEY_CHUNK_SIZE);
        assert_eq!(chunks[2].len(), 100);
        assert_eq!(chunks.concat(), key);
    }

    #[test]
    fn chunk_boundaries_never_split_a_character() {
        // Splitting only; such chunks are too large to seal.
        let key = "ä".repeat(KEY_CHUNK_SIZE + 1);
        let chunks = build_key_chunks(&key);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), KEY_CHUNK_SIZE);
        assert_eq!(KeyField::Chunked(chunks).joined(), key);
    }

    #[test]
    fn empty_key_has_no_chunks() {
        assert!(build_key_chunks("").is_empty());
        assert_eq!(KeyField::chunked("").joined(), "");
    }

    #[test]
    fn key_field_accepts_string_or_list() {
        let single: KeyField = serde_json::from_str(r#""k1""#).unwrap();
        assert_eq!(single, KeyField::Single("k1".into()));
        let chunked: KeyField = serde_json::from_str(r#"["k","1"]"#).unwrap();
        assert!(chunked.is_chunked());
        assert_eq!(chunked.joined(), "k1");
    }

    #[test]
    fn content_post_parses_numeric_text() {
        let post: ContentPostObject = serde_json::from_str(
            r#"{"checksum":"c1","key":"k1","domain":"peer.example","sendingDomain":"home.example","liveTime":"3600","maxOpen":null}"#,
        )
        .unwrap();
        assert_eq!(post.live_time, Some(3600));
        assert_eq!(post.max_open, None);
        assert_eq!(post.sending_domain, "home.example");

        let bad = serde_json::from_str::<ContentPostObject>(r#"{"checksum":"c","maxOpen":"many"}"#);
        assert!(bad.is_err());
    }
}
