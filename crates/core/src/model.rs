//! Persisted audit records.
//!
//! Two record kinds make up the audit trail:
//!
//! - [`GenerationRecord`]: one per attempt to produce a document, successful or not. Records are
//!   immutable once written and may point back at the generation they regenerate.
//! - [`ConfirmationRecord`]: at most one per generation, written when a clinician approves the
//!   document (possibly after editing it).
//!
//! Payloads are kept as [`StoredPayload`] strings: the redaction policy decides what text is
//! retained, and readers parse it back leniently.

use crate::document::DocumentType;
use crate::{AuditResult, ShardableUuid};
use chairside_types::{NonEmptyText, Sha256Hash};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(ShardableUuid);

        impl $name {
            /// Allocates a fresh identifier.
            pub fn new() -> Self {
                Self(ShardableUuid::new())
            }

            /// Parses a canonical 32-character identifier.
            pub fn parse(input: &str) -> AuditResult<Self> {
                Ok(Self(ShardableUuid::parse(input.trim())?))
            }

            pub fn as_uuid(&self) -> &ShardableUuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = crate::AuditError;

            fn from_str(s: &str) -> AuditResult<Self> {
                Self::parse(s)
            }
        }
    };
}

record_id!(
    /// Identifier of a single generation attempt.
    GenerationId
);
record_id!(
    /// Identifier of a confirmation record.
    ConfirmationId
);

/// Outcome of a generation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    Success,
    Error,
}

/// A payload after the redaction policy has been applied, held as serialized JSON.
///
/// The text is whatever the policy chose to keep: the full document, a document with PHI
/// fields replaced by hash markers, or a small marker object saying nothing was stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredPayload(String);

impl StoredPayload {
    pub fn new(serialized: impl Into<String>) -> Self {
        Self(serialized.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the stored text back into a JSON mapping.
    ///
    /// Unparseable text and non-object JSON both come back as an empty mapping; callers treat
    /// that as "no comparable text".
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::from_str::<Value>(&self.0) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                tracing::warn!("stored payload is not valid JSON: {}", e);
                Map::new()
            }
        }
    }
}

/// One attempt to produce a document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: GenerationId,
    pub user_id: NonEmptyText,
    pub document_type: DocumentType,
    pub document_version: String,
    /// Canonical hash of the case data; absent only when the request could not be fingerprinted.
    pub input_fingerprint: Option<Sha256Hash>,
    pub input_payload: StoredPayload,
    pub output_payload: StoredPayload,
    pub model_used: String,
    pub seed: Option<i64>,
    pub is_regenerated: bool,
    pub previous_version_id: Option<GenerationId>,
    pub status: GenerationStatus,
    pub error_message: Option<String>,
    pub tokens_used: Option<u32>,
    pub generation_time_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}

/// Before/after pair kept when a confirmed document differs from the generated one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedSummary {
    pub before: String,
    pub after: String,
}

/// A clinician's approval of a generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfirmationRecord {
    pub id: ConfirmationId,
    pub generation_id: GenerationId,
    pub user_id: NonEmptyText,
    pub document_type: DocumentType,
    pub document_version: String,
    pub confirmed_payload: Option<StoredPayload>,
    pub is_edited: bool,
    pub edited_summary: Option<StoredPayload>,
    pub similarity_score: Option<f64>,
    /// Version chain oldest first, ending with the confirmed generation; empty unless it was a
    /// regeneration.
    pub regeneration_history: Vec<GenerationId>,
    pub notes: Option<String>,
    pub confirmed_at: DateTime<Utc>,
}

impl ConfirmationRecord {
    /// The approved text from the stored before/after pair, if the policy kept it.
    pub fn edited_text(&self) -> Option<String> {
        let stored = self.edited_summary.as_ref()?;
        serde_json::from_str::<EditedSummary>(stored.as_str())
            .ok()
            .map(|summary| summary.after)
    }
}
