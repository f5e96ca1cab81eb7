//! CDT billing code selection.
//!
//! Selection is deterministic and table driven: a primary orthodontic code from the case tier
//! and patient age group, plus diagnostic codes only for assets the request explicitly flags.
//! The table ships with the crate as YAML.

use crate::{AuditError, AuditResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const EMBEDDED_TABLE: &str = include_str!("cdt_codes.yaml");

/// Age boundary between adolescent and adult dentition codes.
pub const ADULT_AGE: u8 = 18;

/// Case tier on treatment summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseTier {
    Express,
    Mild,
    Moderate,
    Complex,
}

/// Case tier on insurance summaries; express and mild share a code so they are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceTier {
    ExpressMild,
    Moderate,
    Complex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AgeGroup {
    Adolescent,
    Adult,
}

/// Age group derived from an optional age.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatientCategory {
    Adolescent,
    Adult,
    Unknown,
}

impl CaseTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            CaseTier::Express => "express",
            CaseTier::Mild => "mild",
            CaseTier::Moderate => "moderate",
            CaseTier::Complex => "complex",
        }
    }
}

impl std::str::FromStr for CaseTier {
    type Err = AuditError;

    fn from_str(s: &str) -> AuditResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "express" => Ok(CaseTier::Express),
            "mild" => Ok(CaseTier::Mild),
            "moderate" => Ok(CaseTier::Moderate),
            "complex" => Ok(CaseTier::Complex),
            other => Err(AuditError::InvalidInput(format!(
                "Invalid tier '{}'. Allowed values: express, mild, moderate, complex",
                other
            ))),
        }
    }
}

impl InsuranceTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            InsuranceTier::ExpressMild => "express_mild",
            InsuranceTier::Moderate => "moderate",
            InsuranceTier::Complex => "complex",
        }
    }
}

impl AgeGroup {
    pub const fn as_str(self) -> &'static str {
        match self {
            AgeGroup::Adolescent => "adolescent",
            AgeGroup::Adult => "adult",
        }
    }
}

impl PatientCategory {
    /// Under 18 is adolescent, 18 and over adult, no age unknown.
    pub fn from_age(age: Option<u8>) -> Self {
        match age {
            None => PatientCategory::Unknown,
            Some(age) if age < ADULT_AGE => PatientCategory::Adolescent,
            Some(_) => PatientCategory::Adult,
        }
    }

    pub fn age_group(self) -> Option<AgeGroup> {
        match self {
            PatientCategory::Adolescent => Some(AgeGroup::Adolescent),
            PatientCategory::Adult => Some(AgeGroup::Adult),
            PatientCategory::Unknown => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PatientCategory::Adolescent => "adolescent",
            PatientCategory::Adult => "adult",
            PatientCategory::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PatientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic records available for a case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct DiagnosticAssets {
    /// Maps to D0350.
    pub intraoral_photos: bool,
    /// Maps to D0330.
    pub panoramic_xray: bool,
    /// Maps to D0210.
    pub fmx: bool,
}

impl DiagnosticAssets {
    fn is_flagged(&self, asset: &str) -> bool {
        match asset {
            "intraoral_photos" => self.intraoral_photos,
            "panoramic_xray" => self.panoramic_xray,
            "fmx" => self.fmx,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CodeRole {
    Primary,
    Diagnostic,
}

/// A selected code with its description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SelectedCode {
    pub code: String,
    pub description: String,
    pub category: CodeRole,
}

/// Codes chosen for one request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CdtSelection {
    pub codes: Vec<SelectedCode>,
    pub notes: Option<String>,
}

impl CdtSelection {
    pub fn primary(&self) -> Option<&SelectedCode> {
        self.codes.iter().find(|c| c.category == CodeRole::Primary)
    }

    pub fn code_strings(&self) -> Vec<String> {
        self.codes.iter().map(|c| c.code.clone()).collect()
    }

    fn note_only(notes: String) -> Self {
        Self {
            codes: Vec::new(),
            notes: Some(notes),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CdtCode {
    pub code: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Deserialize)]
struct CdtRule {
    tier: String,
    age_group: AgeGroup,
    code: String,
}

#[derive(Debug, Deserialize)]
struct DiagnosticRule {
    asset: String,
    code: String,
}

#[derive(Debug, Deserialize)]
struct CdtTableFile {
    codes: Vec<CdtCode>,
    rules: Vec<CdtRule>,
    diagnostics: Vec<DiagnosticRule>,
}

/// Loaded CDT code table.
#[derive(Debug)]
pub struct CdtTable {
    codes: BTreeMap<String, CdtCode>,
    rules: Vec<CdtRule>,
    diagnostics: Vec<DiagnosticRule>,
}

impl CdtTable {
    /// The table compiled into the crate.
    pub fn embedded() -> AuditResult<Self> {
        Self::from_yaml(EMBEDDED_TABLE)
    }

    /// Parses a table and checks every rule refers to a known code.
    pub fn from_yaml(yaml: &str) -> AuditResult<Self> {
        let file: CdtTableFile = serde_yaml::from_str(yaml).map_err(AuditError::CdtTable)?;
        let codes: BTreeMap<_, _> = file
            .codes
            .into_iter()
            .map(|c| (c.code.clone(), c))
            .collect();

        let referenced = file
            .rules
            .iter()
            .map(|r| &r.code)
            .chain(file.diagnostics.iter().map(|d| &d.code));
        for code in referenced {
            if !codes.contains_key(code) {
                return Err(AuditError::InvalidInput(format!(
                    "CDT table references unknown code '{}'",
                    code
                )));
            }
        }

        Ok(Self {
            codes,
            rules: file.rules,
            diagnostics: file.diagnostics,
        })
    }

    pub fn describe(&self, code: &str) -> Option<&CdtCode> {
        self.codes.get(code)
    }

    /// Every known code, ordered by code.
    pub fn codes(&self) -> impl Iterator<Item = &CdtCode> {
        self.codes.values()
    }

    fn rule_for(&self, tier: &str, age_group: AgeGroup) -> Option<&CdtRule> {
        self.rules
            .iter()
            .find(|r| r.tier == tier && r.age_group == age_group)
    }

    fn selected(&self, code: &str, category: CodeRole) -> SelectedCode {
        SelectedCode {
            code: code.to_string(),
            description: self
                .describe(code)
                .map(|c| c.description.clone())
                .unwrap_or_default(),
            category,
        }
    }

    /// Primary code for a treatment summary.
    ///
    /// Without a tier, or without an age to place the patient in an age group, no code is
    /// chosen and the notes say why.
    pub fn select_treatment(&self, tier: Option<CaseTier>, patient_age: Option<u8>) -> CdtSelection {
        let Some(tier) = tier else {
            return CdtSelection::note_only(
                "No tier provided - CDT code selection requires case tier".into(),
            );
        };
        let category = PatientCategory::from_age(patient_age);
        let rule = category
            .age_group()
            .and_then(|group| self.rule_for(tier.as_str(), group));

        match rule {
            Some(rule) => CdtSelection {
                codes: vec![self.selected(&rule.code, CodeRole::Primary)],
                notes: Some(format!(
                    "Selected based on tier={}, age_group={}",
                    tier.as_str(),
                    category
                )),
            },
            None => CdtSelection::note_only(format!(
                "No CDT rule found for tier={}, age_group={}",
                tier.as_str(),
                category
            )),
        }
    }

    /// Primary and diagnostic codes for an insurance summary.
    pub fn select_insurance(
        &self,
        tier: InsuranceTier,
        age_group: AgeGroup,
        assets: &DiagnosticAssets,
        retainers_included: bool,
    ) -> CdtSelection {
        let mut codes = Vec::new();
        let mut notes = Vec::new();

        match self.rule_for(tier.as_str(), age_group) {
            Some(rule) => {
                codes.push(self.selected(&rule.code, CodeRole::Primary));
                notes.push(match tier {
                    InsuranceTier::ExpressMild => {
                        "Limited orthodontic treatment (express/mild tier)".to_string()
                    }
                    _ => format!(
                        "Comprehensive orthodontic treatment, {} ({} tier)",
                        age_group.as_str(),
                        tier.as_str()
                    ),
                });
            }
            None => notes.push("No primary code - unknown tier".to_string()),
        }

        for rule in &self.diagnostics {
            if assets.is_flagged(&rule.asset) {
                codes.push(self.selected(&rule.code, CodeRole::Diagnostic));
            }
        }

        if retainers_included {
            notes.push("Retainers bundled in treatment (not billed separately)".to_string());
        }

        CdtSelection {
            codes,
            notes: Some(notes.join("; ")),
        }
    }
}
