//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Environment variables are read by the binaries only; the helpers
//! here take the raw `Option<String>` values so they can be tested without touching the process
//! environment.

use crate::constants::{DEFAULT_HISTORY_MAX_DEPTH, DEFAULT_MODEL, DEFAULT_PHI_FIELDS, DEFAULT_SEED};
use crate::document::DocumentType;
use crate::redaction::RedactionPolicy;
use crate::{AuditError, AuditResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    redaction: RedactionPolicy,
    treatment_seed: i64,
    insurance_seed: i64,
    model: String,
    history_max_depth: usize,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] if `model` is blank or `history_max_depth` is zero.
    pub fn new(
        data_dir: PathBuf,
        redaction: RedactionPolicy,
        treatment_seed: i64,
        insurance_seed: i64,
        model: String,
        history_max_depth: usize,
    ) -> AuditResult<Self> {
        if model.trim().is_empty() {
            return Err(AuditError::InvalidInput("model cannot be empty".into()));
        }
        if history_max_depth == 0 {
            return Err(AuditError::InvalidInput(
                "history_max_depth must be at least 1".into(),
            ));
        }

        Ok(Self {
            data_dir,
            redaction,
            treatment_seed,
            insurance_seed,
            model: model.trim().to_string(),
            history_max_depth,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn redaction(&self) -> &RedactionPolicy {
        &self.redaction
    }

    /// Seed used for the first generation of `document_type`.
    pub fn default_seed(&self, document_type: DocumentType) -> i64 {
        match document_type {
            DocumentType::TreatmentSummary => self.treatment_seed,
            DocumentType::InsuranceSummary => self.insurance_seed,
            DocumentType::ProgressNotes => DEFAULT_SEED,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn history_max_depth(&self) -> usize {
        self.history_max_depth
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a boolean switch such as `STORE_FULL_AUDIT_DATA`.
///
/// Accepts `true/false`, `1/0`, `yes/no` and `on/off` in any case. Missing or blank values give
/// `default`.
pub fn bool_from_env_value(name: &str, value: Option<String>, default: bool) -> AuditResult<bool> {
    let Some(value) = non_blank(value) else {
        return Ok(default);
    };
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(AuditError::InvalidInput(format!(
            "{} must be a boolean, got: '{}'",
            name, other
        ))),
    }
}

/// Parse a seed override, falling back to `default` when unset.
pub fn seed_from_env_value(name: &str, value: Option<String>, default: i64) -> AuditResult<i64> {
    non_blank(value)
        .map(|v| {
            v.parse::<i64>().map_err(|_| {
                AuditError::InvalidInput(format!("{} must be an integer, got: '{}'", name, v))
            })
        })
        .transpose()
        .map(|seed| seed.unwrap_or(default))
}

/// Parse the history depth limit; unset means [`DEFAULT_HISTORY_MAX_DEPTH`].
pub fn history_depth_from_env_value(value: Option<String>) -> AuditResult<usize> {
    let Some(value) = non_blank(value) else {
        return Ok(DEFAULT_HISTORY_MAX_DEPTH);
    };
    match value.parse::<usize>() {
        Ok(depth) if depth > 0 => Ok(depth),
        _ => Err(AuditError::InvalidInput(format!(
            "HISTORY_MAX_DEPTH must be a positive integer, got: '{}'",
            value
        ))),
    }
}

/// Parse a comma-separated PHI field list. Unset gives the default field list.
pub fn phi_fields_from_env_value(value: Option<String>) -> Vec<String> {
    match non_blank(value) {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect(),
        None => DEFAULT_PHI_FIELDS.iter().map(|f| f.to_string()).collect(),
    }
}

/// Build the redaction policy from `STORE_FULL_AUDIT_DATA`, `REDACT_PHI_FIELDS` and `PHI_FIELDS`.
///
/// Full storage defaults to on and field redaction to off.
pub fn redaction_policy_from_env_values(
    store_full: Option<String>,
    redact_fields: Option<String>,
    phi_fields: Option<String>,
) -> AuditResult<RedactionPolicy> {
    let store_full = bool_from_env_value("STORE_FULL_AUDIT_DATA", store_full, true)?;
    let redact = bool_from_env_value("REDACT_PHI_FIELDS", redact_fields, false)?;
    Ok(RedactionPolicy::from_flags(
        store_full,
        redact,
        phi_fields_from_env_value(phi_fields),
    ))
}

/// Resolve the model name, using [`DEFAULT_MODEL`] when unset.
pub fn model_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_MODEL.to_string())
}
