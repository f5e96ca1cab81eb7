//! Document generation requests.
//!
//! Each document type has a request type implementing [`DocumentRequest`]. The trait carries
//! everything the generation pipeline needs to know about a document: validation, regeneration
//! control fields, prompts, sampling parameters, the structured output schema, output
//! post-processing and billing codes.

mod insurance;
mod treatment;

pub use insurance::{InsuranceSummaryRequest, DEFAULT_INSURANCE_DISCLAIMER};
pub use treatment::{
    Attachments, AreaTreated, Audience, CaseDifficulty, Tone, TreatmentSummaryRequest,
    TreatmentType,
};

use crate::cdt::{CdtSelection, CdtTable};
use crate::document::DocumentType;
use crate::fingerprint::fingerprint;
use crate::model::GenerationId;
use crate::{AuditError, AuditResult};
use chairside_types::Sha256Hash;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sampling parameters sent with every completion for a document type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Arches {
    Upper,
    Lower,
    #[default]
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum MonitoringApproach {
    #[serde(rename = "remote")]
    Remote,
    #[default]
    #[serde(rename = "mixed")]
    Mixed,
    #[serde(rename = "in-clinic")]
    InClinic,
}

impl Arches {
    pub const fn as_str(self) -> &'static str {
        match self {
            Arches::Upper => "upper",
            Arches::Lower => "lower",
            Arches::Both => "both",
        }
    }
}

impl MonitoringApproach {
    pub const fn as_str(self) -> &'static str {
        match self {
            MonitoringApproach::Remote => "remote",
            MonitoringApproach::Mixed => "mixed",
            MonitoringApproach::InClinic => "in-clinic",
        }
    }
}

/// A request that can be turned into a generated document.
pub trait DocumentRequest: Serialize + Send + Sync {
    const DOCUMENT_TYPE: DocumentType;
    /// Name given to the structured output schema.
    const SCHEMA_NAME: &'static str;

    /// Checks field lengths and ranges.
    fn validate(&self) -> AuditResult<()>;

    fn is_regeneration(&self) -> bool;

    /// Raw previous generation id as supplied by the caller.
    fn previous_version_uuid(&self) -> Option<&str>;

    fn system_prompt(&self) -> &'static str;

    fn user_prompt(&self) -> String;

    fn sampling(&self) -> Sampling;

    /// JSON schema the model output must follow.
    fn output_schema(&self) -> Value;

    /// Normalises raw model output and fills system-owned fields.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Llm` if a required field is missing.
    fn finish_output(&self, raw: Map<String, Value>) -> AuditResult<Map<String, Value>>;

    /// CDT codes for the case, if the request carries enough to choose any.
    fn billing_codes(&self, table: &CdtTable) -> Option<CdtSelection>;

    /// Parsed previous generation id.
    ///
    /// A value that is not a canonical generation id cannot name a recorded generation, so it
    /// is logged and treated as absent. The raw value stays in the recorded input.
    fn previous_version_id(&self) -> Option<GenerationId> {
        let raw = self.previous_version_uuid().map(str::trim).filter(|id| !id.is_empty())?;
        match GenerationId::parse(raw) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("previous_version_uuid '{}' cannot be resolved: {}", raw, e);
                None
            }
        }
    }
}

/// Fingerprint a raw JSON request body the way it is fingerprinted when generated.
///
/// The body is parsed into the request type for `document_type` first, so omitted fields take
/// their defaults exactly as they do on the generation path.
///
/// # Errors
///
/// Returns `InvalidInput` if the body does not parse as a request for `document_type`, or if
/// the document type has no request type.
pub fn request_fingerprint(document_type: DocumentType, body: &str) -> AuditResult<Sha256Hash> {
    fn parse<R: DocumentRequest + serde::de::DeserializeOwned>(body: &str) -> AuditResult<Value> {
        let request: R = serde_json::from_str(body).map_err(|e| {
            AuditError::InvalidInput(format!("invalid {} request: {}", R::DOCUMENT_TYPE, e))
        })?;
        serde_json::to_value(&request).map_err(AuditError::Serialization)
    }

    let input = match document_type {
        DocumentType::TreatmentSummary => parse::<TreatmentSummaryRequest>(body)?,
        DocumentType::InsuranceSummary => parse::<InsuranceSummaryRequest>(body)?,
        other => {
            return Err(AuditError::InvalidInput(format!(
                "no generation request exists for {}",
                other
            )))
        }
    };
    Ok(fingerprint(&input))
}

pub(crate) fn check_length(
    field: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> AuditResult<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let len = value.chars().count();
    if len < min || len > max {
        return Err(AuditError::InvalidInput(format!(
            "{} must be between {} and {} characters, got {}",
            field, min, max, len
        )));
    }
    Ok(())
}

/// Builds a strict object schema whose properties are all strings.
pub(crate) fn string_object_schema(fields: &[(&str, &str)]) -> Value {
    let mut properties = Map::new();
    for (name, description) in fields {
        properties.insert(
            name.to_string(),
            serde_json::json!({"type": "string", "description": description}),
        );
    }
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": fields.iter().map(|(name, _)| *name).collect::<Vec<_>>(),
        "additionalProperties": false,
    })
}

pub(crate) fn require_string(
    output: &Map<String, Value>,
    field: &str,
) -> AuditResult<()> {
    match output.get(field) {
        Some(Value::String(_)) => Ok(()),
        _ => Err(AuditError::Llm(format!(
            "structured output missing string field '{}'",
            field
        ))),
    }
}
