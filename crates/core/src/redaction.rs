//! PHI handling for persisted payloads.
//!
//! Whatever the policy, [`RedactionPolicy::apply`] turns a JSON payload into the
//! [`StoredPayload`] text that is written to the audit store. The unredacted payload never
//! leaves the caller.

use crate::model::StoredPayload;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

const MINIMAL_MARKER_REASON: &str = "Full audit data storage disabled";

/// How payloads are stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedactionPolicy {
    /// Store payloads as generated.
    StoreFull,
    /// Replace the named top-level fields with `[REDACTED:<hash8>]` markers.
    RedactFields(Vec<String>),
    /// Store a small marker object instead of the payload.
    Minimal,
}

impl RedactionPolicy {
    /// Builds the policy from the two storage switches.
    ///
    /// Field redaction wins over full storage when both are enabled.
    pub fn from_flags(store_full_data: bool, redact_fields: bool, fields: Vec<String>) -> Self {
        if redact_fields {
            RedactionPolicy::RedactFields(fields)
        } else if store_full_data {
            RedactionPolicy::StoreFull
        } else {
            RedactionPolicy::Minimal
        }
    }

    /// Produces the text to persist for `payload`.
    pub fn apply(&self, payload: &Value) -> StoredPayload {
        match self {
            RedactionPolicy::StoreFull => StoredPayload::new(payload.to_string()),
            RedactionPolicy::RedactFields(fields) => {
                StoredPayload::new(redact_fields(payload, fields).to_string())
            }
            RedactionPolicy::Minimal => {
                let timestamp = payload
                    .get("timestamp")
                    .cloned()
                    .unwrap_or_else(|| Value::String("unknown".into()));
                let marker = json!({
                    "stored": false,
                    "reason": MINIMAL_MARKER_REASON,
                    "timestamp": timestamp,
                });
                StoredPayload::new(marker.to_string())
            }
        }
    }
}

fn redact_fields(payload: &Value, fields: &[String]) -> Value {
    let Value::Object(map) = payload else {
        return payload.clone();
    };

    let mut redacted = Map::with_capacity(map.len());
    for (key, value) in map {
        let replacement = if !value.is_null() && fields.iter().any(|f| f == key) {
            Value::String(redaction_marker(value))
        } else {
            value.clone()
        };
        redacted.insert(key.clone(), replacement);
    }
    Value::Object(redacted)
}

/// `[REDACTED:<first 8 hex chars of sha256(value)>]`; strings are hashed without quotes.
fn redaction_marker(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let digest = hex::encode(Sha256::digest(text.as_bytes()));
    format!("[REDACTED:{}]", &digest[..8])
}
