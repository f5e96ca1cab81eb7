//! Request and response bodies of the REST surface.

use chairside_core::cdt::{CdtSelection, CodeRole};
use chairside_core::requests::{InsuranceSummaryRequest, TreatmentSummaryRequest};
use chairside_core::{ConfirmationRecord, GeneratedDocument, GenerationId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// CDT codes attached to a treatment summary.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TreatmentCdtCodes {
    pub primary_code: Option<String>,
    pub primary_description: Option<String>,
    pub suggested_add_ons: Vec<String>,
    pub notes: Option<String>,
}

impl From<CdtSelection> for TreatmentCdtCodes {
    fn from(selection: CdtSelection) -> Self {
        let primary = selection.primary().cloned();
        Self {
            primary_code: primary.as_ref().map(|c| c.code.clone()),
            primary_description: primary.map(|c| c.description),
            suggested_add_ons: selection
                .codes
                .iter()
                .filter(|c| c.category != CodeRole::Primary)
                .map(|c| c.code.clone())
                .collect(),
            notes: selection.notes,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TreatmentSummaryRes {
    pub success: bool,
    /// Generated `title` and `summary`.
    #[schema(value_type = Object)]
    pub document: Map<String, Value>,
    #[schema(value_type = Object)]
    pub metadata: Value,
    /// Generation id, used to confirm or regenerate this draft.
    pub uuid: String,
    pub is_regenerated: bool,
    pub previous_version_uuid: Option<String>,
    pub seed: i64,
    pub cdt_codes: Option<TreatmentCdtCodes>,
}

impl TreatmentSummaryRes {
    pub fn new(request: &TreatmentSummaryRequest, doc: GeneratedDocument) -> Self {
        Self {
            success: true,
            metadata: json!({
                "tokens_used": doc.tokens_used,
                "generation_time_ms": doc.generation_time_ms,
                "audience": request.audience.as_str(),
                "tone": request.tone.as_str(),
                "seed": doc.seed,
                "document_version": doc.document_version,
            }),
            document: doc.output,
            uuid: doc.generation_id.to_string(),
            is_regenerated: doc.is_regenerated,
            previous_version_uuid: doc.previous_version_id.map(|id| id.to_string()),
            seed: doc.seed,
            cdt_codes: doc.cdt.map(TreatmentCdtCodes::from),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InsuranceSummaryRes {
    pub success: bool,
    /// Generated `insurance_summary` and `disclaimer`.
    #[schema(value_type = Object)]
    pub document: Map<String, Value>,
    /// CDT code strings, primary first.
    pub cdt_codes: Vec<String>,
    #[schema(value_type = Object)]
    pub metadata: Value,
    pub uuid: String,
    pub is_regenerated: bool,
    pub previous_version_uuid: Option<String>,
    pub seed: i64,
}

impl InsuranceSummaryRes {
    pub fn new(request: &InsuranceSummaryRequest, doc: GeneratedDocument) -> Self {
        let cdt = doc.cdt.unwrap_or_default();
        Self {
            success: true,
            metadata: json!({
                "tokens_used": doc.tokens_used,
                "generation_time_ms": doc.generation_time_ms,
                "tier": request.tier.as_str(),
                "age_group": request.age_group.as_str(),
                "seed": doc.seed,
                "document_version": doc.document_version,
                "cdt_notes": cdt.notes,
            }),
            cdt_codes: cdt.code_strings(),
            document: doc.output,
            uuid: doc.generation_id.to_string(),
            is_regenerated: doc.is_regenerated,
            previous_version_uuid: doc.previous_version_id.map(|id| id.to_string()),
            seed: doc.seed,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfirmDocumentReq {
    /// Final document content, if the dentist edited it.
    #[schema(value_type = Option<Object>)]
    #[serde(default)]
    pub confirmed_payload: Option<Value>,
    /// Optional notes, at most 1000 characters.
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfirmationRes {
    pub success: bool,
    pub confirmation_id: String,
    pub generation_id: String,
    pub user_id: String,
    pub document_type: String,
    pub document_version: String,
    pub confirmed_at: DateTime<Utc>,
    pub is_edited: bool,
    /// Approved text when it differs from the generated text.
    pub edited_summary: Option<String>,
    pub similarity_score: Option<f64>,
    /// Generation ids from the first draft up to the confirmed one.
    pub regeneration_history: Vec<String>,
    pub notes: Option<String>,
    pub message: String,
}

impl ConfirmationRes {
    pub fn new(record: ConfirmationRecord, message: &str) -> Self {
        Self {
            success: true,
            confirmation_id: record.id.to_string(),
            generation_id: record.generation_id.to_string(),
            user_id: record.user_id.to_string(),
            document_type: record.document_type.to_string(),
            edited_summary: record.edited_text(),
            document_version: record.document_version,
            confirmed_at: record.confirmed_at,
            is_edited: record.is_edited,
            similarity_score: record.similarity_score,
            regeneration_history: record
                .regeneration_history
                .iter()
                .map(GenerationId::to_string)
                .collect(),
            notes: record.notes,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HistoryRes {
    pub generation_id: String,
    /// Oldest first, ending with `generation_id`. Empty unless it is a regeneration.
    pub history: Vec<String>,
}
