//! Document types and their versioned payload shapes.
//!
//! Every generation and confirmation is tagged with a [`DocumentType`]. The type decides which
//! schema version is recorded and which output field carries the human-readable text used when
//! comparing a confirmed document against what was generated.

use crate::constants::FALLBACK_DOCUMENT_VERSION;
use crate::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Kinds of clinical document the service produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    TreatmentSummary,
    InsuranceSummary,
    /// Reserved; no generator exists yet but records may still carry the tag.
    ProgressNotes,
}

/// Schema version currently produced for each document type.
const DOCUMENT_VERSIONS: &[(DocumentType, &str)] = &[
    (DocumentType::TreatmentSummary, "1.0"),
    (DocumentType::InsuranceSummary, "1.0"),
];

/// Output fields holding the comparable text, tried in order.
const PAYLOAD_SHAPES: &[(DocumentType, PayloadShape)] = &[
    (
        DocumentType::TreatmentSummary,
        PayloadShape {
            text_fields: &["treatment_summary", "summary"],
        },
    ),
    (
        DocumentType::InsuranceSummary,
        PayloadShape {
            text_fields: &["insurance_summary"],
        },
    ),
];

const FALLBACK_SHAPE: PayloadShape = PayloadShape {
    text_fields: &["summary"],
};

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::TreatmentSummary,
        DocumentType::InsuranceSummary,
        DocumentType::ProgressNotes,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentType::TreatmentSummary => "treatment_summary",
            DocumentType::InsuranceSummary => "insurance_summary",
            DocumentType::ProgressNotes => "progress_notes",
        }
    }

    /// Schema version recorded on new generations and confirmations of this type.
    ///
    /// Types missing from the version table fall back to `"1.0"`.
    pub fn document_version(self) -> &'static str {
        DOCUMENT_VERSIONS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, version)| *version)
            .unwrap_or(FALLBACK_DOCUMENT_VERSION)
    }

    /// Payload shape used to pull comparable text out of outputs of this type.
    pub fn payload_shape(self) -> &'static PayloadShape {
        PAYLOAD_SHAPES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, shape)| shape)
            .unwrap_or(&FALLBACK_SHAPE)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = AuditError;

    fn from_str(s: &str) -> AuditResult<Self> {
        DocumentType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| AuditError::InvalidInput(format!("unknown document type: '{}'", s)))
    }
}

/// Describes where the human-readable text lives inside an output payload.
#[derive(Debug, PartialEq, Eq)]
pub struct PayloadShape {
    text_fields: &'static [&'static str],
}

impl PayloadShape {
    /// Returns the first configured text field present in `payload` as a string.
    ///
    /// Fields holding non-string values are skipped.
    pub fn comparable_text<'a>(&self, payload: &'a Map<String, Value>) -> Option<&'a str> {
        self.text_fields
            .iter()
            .find_map(|field| payload.get(*field).and_then(Value::as_str))
    }
}
