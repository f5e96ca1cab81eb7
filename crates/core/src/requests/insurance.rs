use super::{
    check_length, require_string, string_object_schema, Arches, DocumentRequest,
    MonitoringApproach, Sampling,
};
use crate::cdt::{AgeGroup, CdtSelection, CdtTable, DiagnosticAssets, InsuranceTier};
use crate::document::DocumentType;
use crate::prompts::INSURANCE_SUMMARY_SYSTEM_PROMPT;
use crate::text::{normalize_output, normalize_to_ascii};
use crate::AuditResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Appended to every insurance summary the model does not supply one for.
pub const DEFAULT_INSURANCE_DISCLAIMER: &str = "This document is provided for administrative \
support only. Coverage and reimbursement are determined solely by the patient's insurance \
provider. Submission of this information does not guarantee payment or approval.";

fn default_true() -> bool {
    true
}

/// Case details for an administrative insurance summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InsuranceSummaryRequest {
    #[serde(default)]
    pub is_regeneration: bool,
    #[serde(default)]
    pub previous_version_uuid: Option<String>,
    pub tier: InsuranceTier,
    #[serde(default)]
    pub arches: Arches,
    pub age_group: AgeGroup,
    /// Retainers are bundled into the treatment rather than billed separately.
    #[serde(default = "default_true")]
    pub retainers_included: bool,
    /// Only flagged assets produce diagnostic codes.
    #[serde(default)]
    pub diagnostic_assets: DiagnosticAssets,
    #[serde(default)]
    pub monitoring_approach: MonitoringApproach,
    /// Optional dentist or admin note, at most 500 characters.
    #[serde(default)]
    pub notes: Option<String>,
}

impl InsuranceSummaryRequest {
    pub fn new(tier: InsuranceTier, age_group: AgeGroup) -> Self {
        Self {
            is_regeneration: false,
            previous_version_uuid: None,
            tier,
            arches: Arches::default(),
            age_group,
            retainers_included: true,
            diagnostic_assets: DiagnosticAssets::default(),
            monitoring_approach: MonitoringApproach::default(),
            notes: None,
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

impl DocumentRequest for InsuranceSummaryRequest {
    const DOCUMENT_TYPE: DocumentType = DocumentType::InsuranceSummary;
    const SCHEMA_NAME: &'static str = "insurance_summary";

    fn validate(&self) -> AuditResult<()> {
        check_length("notes", self.notes.as_deref(), 0, 500)
    }

    fn is_regeneration(&self) -> bool {
        self.is_regeneration
    }

    fn previous_version_uuid(&self) -> Option<&str> {
        self.previous_version_uuid.as_deref()
    }

    fn system_prompt(&self) -> &'static str {
        INSURANCE_SUMMARY_SYSTEM_PROMPT
    }

    fn user_prompt(&self) -> String {
        let assets = &self.diagnostic_assets;
        let mut lines = vec![
            "Generate an insurance summary with the following case details:".to_string(),
            String::new(),
            format!("**Tier:** {}", self.tier.as_str()),
            format!("**Arches:** {}", self.arches.as_str()),
            format!("**Age Group:** {}", self.age_group.as_str()),
            format!(
                "**Retainers Included:** {}",
                if self.retainers_included {
                    "Yes (bundled)"
                } else {
                    "No"
                }
            ),
            format!("**Monitoring Approach:** {}", self.monitoring_approach.as_str()),
            String::new(),
            "**Diagnostic Assets:**".to_string(),
            format!("- Intraoral photos: {}", yes_no(assets.intraoral_photos)),
            format!("- Panoramic X-ray: {}", yes_no(assets.panoramic_xray)),
            format!("- FMX (Full Mouth X-rays): {}", yes_no(assets.fmx)),
        ];
        if let Some(notes) = &self.notes {
            lines.push(String::new());
            lines.push(format!("**Additional Notes:** {}", notes));
        }
        lines.extend(
            [
                "",
                "Generate the insurance summary following all guidelines. Remember:",
                "- Use neutral, factual, non-promissory language",
                "- Do NOT include diagnosis language or medical necessity statements",
                "- Do NOT promise coverage or guarantee reimbursement",
                "- Do NOT include pricing information",
                "- Reference that this is for administrative/insurance documentation purposes",
                "- Mention retention is included if retainers are bundled",
            ]
            .map(String::from),
        );
        lines.join("\n")
    }

    fn sampling(&self) -> Sampling {
        Sampling {
            temperature: 0.5,
            max_tokens: 1500,
        }
    }

    fn output_schema(&self) -> Value {
        string_object_schema(&[
            (
                "insurance_summary",
                "The generated insurance summary text (admin use only)",
            ),
            ("disclaimer", "Required disclaimer"),
        ])
    }

    fn finish_output(&self, raw: Map<String, Value>) -> AuditResult<Map<String, Value>> {
        let mut output = normalize_output(raw);
        require_string(&output, "insurance_summary")?;
        let has_disclaimer = output
            .get("disclaimer")
            .and_then(Value::as_str)
            .is_some_and(|d| !d.trim().is_empty());
        if !has_disclaimer {
            output.insert(
                "disclaimer".into(),
                Value::String(normalize_to_ascii(DEFAULT_INSURANCE_DISCLAIMER)),
            );
        }
        Ok(output)
    }

    fn billing_codes(&self, table: &CdtTable) -> Option<CdtSelection> {
        Some(table.select_insurance(
            self.tier,
            self.age_group,
            &self.diagnostic_assets,
            self.retainers_included,
        ))
    }
}
