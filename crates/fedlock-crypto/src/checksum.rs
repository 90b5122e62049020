use serde_json::Value;
use sha2::{Digest, Sha256};

/// Writes `value` as compact JSON with object keys sorted at every level.
///
/// Sorting is done here rather than relied upon from `serde_json::Map`, whose
/// order depends on the `preserve_order` feature of the whole build.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Canonical serialization the checksum is computed over.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

/// Checksum of an (encrypted) envelope.
pub fn checksum(envelope: &Value) -> String {
    hex::encode(Sha256::digest(canonical_json(envelope).as_bytes()))
}

/// Recomputes the checksum of `body` and compares it with `expected`.
pub fn verify_checksum(expected: &str, body: &Value) -> bool {
    let actual = checksum(body);
    // Length is public; compare the rest without early exit.
    expected.len() == actual.len()
        && expected
            .bytes()
            .zip(actual.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
