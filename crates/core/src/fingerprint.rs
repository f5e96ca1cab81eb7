//! Input fingerprinting.
//!
//! A fingerprint is the SHA-256 of a request's case data in a canonical form: regeneration
//! control fields removed, object keys sorted at every depth, no whitespace, non-ASCII text left
//! unescaped. A generation and its regeneration from the same case data therefore share a
//! fingerprint regardless of how the caller ordered the fields.

use crate::constants::REGENERATION_CONTROL_FIELDS;
use chairside_types::Sha256Hash;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Computes the fingerprint of `input`.
///
/// Only top-level control fields are removed; nested objects are hashed as given (with sorted
/// keys).
pub fn fingerprint(input: &Value) -> Sha256Hash {
    let canonical = canonical_json(input);
    let digest: [u8; 32] = Sha256::digest(canonical.as_bytes()).into();
    Sha256Hash::from_bytes(&digest)
}

/// Canonical text hashed by [`fingerprint`].
pub fn canonical_json(input: &Value) -> String {
    let mut out = String::new();
    match input {
        Value::Object(map) => {
            let filtered = map
                .iter()
                .filter(|(key, _)| !REGENERATION_CONTROL_FIELDS.contains(&key.as_str()));
            write_object(filtered, &mut out);
        }
        other => write_value(other, &mut out),
    }
    out
}

fn write_object<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>, out: &mut String) {
    let mut entries: Vec<_> = entries.collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(key, out);
        out.push(':');
        write_value(value, out);
    }
    out.push('}');
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => write_object(map.iter(), out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        // Null, bools and numbers have a single compact rendering.
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_string(s: &str, out: &mut String) {
    // serde_json only escapes quotes, backslashes and control characters.
    out.push_str(&Value::String(s.to_string()).to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fingerprint_ignores_key_order() {
        let a = json!({"case_tier": "moderate", "age": 25, "arches": "both"});
        let b = json!({"arches": "both", "age": 25, "case_tier": "moderate"});
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_ignores_regeneration_fields() {
        let fresh = json!({"case_tier": "moderate", "age": 25});
        let regen = json!({
            "case_tier": "moderate",
            "age": 25,
            "is_regeneration": true,
            "previous_version_uuid": "550e8400e29b41d4a716446655440000",
        });
        assert_eq!(fingerprint(&fresh), fingerprint(&regen));
    }

    #[test]
    fn test_fingerprint_changes_with_case_data() {
        let a = json!({"case_tier": "moderate"});
        let b = json!({"case_tier": "complex"});
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_canonical_json_is_compact_sorted_and_unescaped() {
        let input = json!({
            "b": {"z": 1, "y": [true, null]},
            "a": "Zoë – café",
            "is_regeneration": false,
        });
        assert_eq!(
            canonical_json(&input),
            r#"{"a":"Zoë – café","b":{"y":[true,null],"z":1}}"#
        );
    }

    #[test]
    fn test_fingerprint_is_lowercase_hex_of_canonical_text() {
        let input = json!({"age": 25});
        let expected = hex::encode(Sha256::digest(br#"{"age":25}"#));
        assert_eq!(fingerprint(&input).as_str(), expected);
    }
}
