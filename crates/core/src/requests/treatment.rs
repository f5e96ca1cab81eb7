use super::{
    check_length, require_string, string_object_schema, DocumentRequest, MonitoringApproach,
    Sampling,
};
use crate::cdt::{CaseTier, CdtSelection, CdtTable, PatientCategory};
use crate::document::DocumentType;
use crate::prompts::TREATMENT_SUMMARY_SYSTEM_PROMPT;
use crate::text::normalize_output;
use crate::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const MAX_PATIENT_AGE: u8 = 120;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum TreatmentType {
    #[default]
    #[serde(rename = "clear aligners")]
    ClearAligners,
    #[serde(rename = "traditional braces")]
    TraditionalBraces,
    #[serde(rename = "lingual braces")]
    LingualBraces,
    #[serde(rename = "retainers")]
    Retainers,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AreaTreated {
    Upper,
    Lower,
    #[default]
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseDifficulty {
    Simple,
    #[default]
    Moderate,
    Complex,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Attachments {
    None,
    #[default]
    Some,
    Extensive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    Patient,
    Internal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Concise,
    Casual,
    #[default]
    Reassuring,
    Clinical,
}

impl TreatmentType {
    pub const fn as_str(self) -> &'static str {
        match self {
            TreatmentType::ClearAligners => "clear aligners",
            TreatmentType::TraditionalBraces => "traditional braces",
            TreatmentType::LingualBraces => "lingual braces",
            TreatmentType::Retainers => "retainers",
        }
    }
}

impl AreaTreated {
    pub const fn as_str(self) -> &'static str {
        match self {
            AreaTreated::Upper => "upper",
            AreaTreated::Lower => "lower",
            AreaTreated::Both => "both",
        }
    }
}

impl CaseDifficulty {
    pub const fn as_str(self) -> &'static str {
        match self {
            CaseDifficulty::Simple => "simple",
            CaseDifficulty::Moderate => "moderate",
            CaseDifficulty::Complex => "complex",
        }
    }
}

impl Attachments {
    pub const fn as_str(self) -> &'static str {
        match self {
            Attachments::None => "none",
            Attachments::Some => "some",
            Attachments::Extensive => "extensive",
        }
    }
}

impl Audience {
    pub const fn as_str(self) -> &'static str {
        match self {
            Audience::Patient => "patient",
            Audience::Internal => "internal",
        }
    }
}

impl Tone {
    pub const fn as_str(self) -> &'static str {
        match self {
            Tone::Concise => "concise",
            Tone::Casual => "casual",
            Tone::Reassuring => "reassuring",
            Tone::Clinical => "clinical",
        }
    }
}

fn default_duration_range() -> String {
    "4-6 months".to_string()
}

/// Case details for a patient-facing or internal treatment summary.
///
/// Every field has a default, so `{}` is a valid request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct TreatmentSummaryRequest {
    pub is_regeneration: bool,
    /// Generation this request regenerates.
    pub previous_version_uuid: Option<String>,
    /// Case tier used to choose CDT codes.
    pub tier: Option<CaseTier>,
    pub treatment_type: TreatmentType,
    pub area_treated: AreaTreated,
    /// Expected duration, e.g. "4-6 months". 1 to 50 characters.
    pub duration_range: String,
    pub case_difficulty: CaseDifficulty,
    pub monitoring_approach: MonitoringApproach,
    pub attachments: Attachments,
    pub whitening_included: bool,
    /// Optional note from the dentist, at most 500 characters.
    pub dentist_note: Option<String>,
    pub audience: Audience,
    pub tone: Tone,
    pub patient_name: Option<String>,
    pub practice_name: Option<String>,
    /// 0 to 120.
    pub patient_age: Option<u8>,
}

impl Default for TreatmentSummaryRequest {
    fn default() -> Self {
        Self {
            is_regeneration: false,
            previous_version_uuid: None,
            tier: None,
            treatment_type: TreatmentType::default(),
            area_treated: AreaTreated::default(),
            duration_range: default_duration_range(),
            case_difficulty: CaseDifficulty::default(),
            monitoring_approach: MonitoringApproach::default(),
            attachments: Attachments::default(),
            whitening_included: false,
            dentist_note: None,
            audience: Audience::default(),
            tone: Tone::default(),
            patient_name: None,
            practice_name: None,
            patient_age: None,
        }
    }
}

impl DocumentRequest for TreatmentSummaryRequest {
    const DOCUMENT_TYPE: DocumentType = DocumentType::TreatmentSummary;
    const SCHEMA_NAME: &'static str = "treatment_summary";

    fn validate(&self) -> AuditResult<()> {
        check_length("duration_range", Some(&self.duration_range), 1, 50)?;
        check_length("dentist_note", self.dentist_note.as_deref(), 0, 500)?;
        check_length("patient_name", self.patient_name.as_deref(), 0, 200)?;
        check_length("practice_name", self.practice_name.as_deref(), 0, 200)?;
        if let Some(age) = self.patient_age {
            if age > MAX_PATIENT_AGE {
                return Err(AuditError::InvalidInput(format!(
                    "patient_age must be between 0 and {}, got {}",
                    MAX_PATIENT_AGE, age
                )));
            }
        }
        Ok(())
    }

    fn is_regeneration(&self) -> bool {
        self.is_regeneration
    }

    fn previous_version_uuid(&self) -> Option<&str> {
        self.previous_version_uuid.as_deref()
    }

    fn system_prompt(&self) -> &'static str {
        TREATMENT_SUMMARY_SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        let mut lines = vec![
            "Generate a treatment summary with the following case details:".to_string(),
            String::new(),
        ];
        if let Some(name) = &self.patient_name {
            lines.push(format!("**Patient Name:** {}", name));
        }
        if let Some(name) = &self.practice_name {
            lines.push(format!("**Practice Name:** {}", name));
        }
        if let Some(age) = self.patient_age {
            lines.push(format!(
                "**Patient Age:** {} ({})",
                age,
                PatientCategory::from_age(Some(age))
            ));
        }
        lines.extend([
            format!("**Treatment Type:** {}", self.treatment_type.as_str()),
            format!("**Area Treated:** {}", self.area_treated.as_str()),
            format!("**Expected Duration:** {}", self.duration_range),
            format!("**Case Difficulty:** {}", self.case_difficulty.as_str()),
            format!("**Monitoring Approach:** {}", self.monitoring_approach.as_str()),
            format!("**Attachments:** {}", self.attachments.as_str()),
            format!(
                "**Whitening Included:** {}",
                if self.whitening_included { "Yes" } else { "No" }
            ),
        ]);
        if let Some(note) = &self.dentist_note {
            lines.push(format!("**Dentist Note:** {}", note));
        }
        lines.extend([
            String::new(),
            format!("**Target Audience:** {}", self.audience.as_str()),
            format!("**Desired Tone:** {}", self.tone.as_str()),
            String::new(),
            "Please generate the treatment summary following all guidelines and restrictions."
                .to_string(),
        ]);
        lines.join("\n")
    }

    fn sampling(&self) -> Sampling {
        Sampling {
            temperature: 0.7,
            max_tokens: 2000,
        }
    }

    fn output_schema(&self) -> Value {
        string_object_schema(&[
            ("title", "A brief title for the treatment summary"),
            ("summary", "The main treatment summary text"),
        ])
    }

    fn finish_output(&self, raw: Map<String, Value>) -> AuditResult<Map<String, Value>> {
        let output = normalize_output(raw);
        require_string(&output, "title")?;
        require_string(&output, "summary")?;
        Ok(output)
    }

    fn billing_codes(&self, table: &CdtTable) -> Option<CdtSelection> {
        if self.tier.is_none() && self.patient_age.is_none() {
            return None;
        }
        Some(table.select_treatment(self.tier, self.patient_age))
    }
}
