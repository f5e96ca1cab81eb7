//! Generation audit recording.
//!
//! [`AuditRecorder`] is the only writer of [`GenerationRecord`]s. It stamps each attempt with
//! the schema version, input fingerprint and a fresh id, applies the redaction policy to both
//! payloads and hands the result to the [`AuditStore`]. It also serves the read path used when
//! choosing regeneration seeds and evaluating confirmations.

use crate::config::CoreConfig;
use crate::fingerprint::fingerprint;
use crate::model::{GenerationId, GenerationRecord, GenerationStatus};
use crate::store::AuditStore;
use crate::AuditResult;
use chairside_types::{NonEmptyText, Sha256Hash};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

/// Read access to generation records by id.
pub trait GenerationLookup {
    fn find_generation(&self, id: &GenerationId) -> AuditResult<Option<GenerationRecord>>;
}

impl<S: AuditStore + ?Sized> GenerationLookup for S {
    fn find_generation(&self, id: &GenerationId) -> AuditResult<Option<GenerationRecord>> {
        self.get_generation(id)
    }
}

/// One generation attempt, before redaction and persistence.
#[derive(Clone, Debug)]
pub struct NewGeneration {
    pub user_id: NonEmptyText,
    pub document_type: crate::DocumentType,
    /// Request as received, including any regeneration control fields.
    pub input: Value,
    /// Structured output, or an empty object when generation failed.
    pub output: Value,
    pub seed: Option<i64>,
    pub is_regenerated: bool,
    pub previous_version_id: Option<GenerationId>,
    pub status: GenerationStatus,
    pub error_message: Option<String>,
    pub tokens_used: Option<u32>,
    pub generation_time_ms: Option<u64>,
}

/// Writes and reads generation audit records.
#[derive(Clone)]
pub struct AuditRecorder {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn AuditStore>,
}

impl AuditRecorder {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn AuditStore>) -> Self {
        Self { cfg, store }
    }

    /// Persists a generation attempt and returns the stored record.
    ///
    /// The fingerprint is taken from the unredacted input so that it stays stable whatever
    /// redaction policy is configured.
    ///
    /// # Arguments
    ///
    /// * `new` - The attempt to record, success or failure.
    ///
    /// # Returns
    ///
    /// The record as written, with redacted payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn record(&self, new: NewGeneration) -> AuditResult<GenerationRecord> {
        let policy = self.cfg.redaction();
        let record = GenerationRecord {
            id: GenerationId::new(),
            user_id: new.user_id,
            document_type: new.document_type,
            document_version: new.document_type.document_version().to_string(),
            input_fingerprint: Some(fingerprint(&new.input)),
            input_payload: policy.apply(&new.input),
            output_payload: policy.apply(&new.output),
            model_used: self.cfg.model().to_string(),
            seed: new.seed,
            is_regenerated: new.is_regenerated,
            previous_version_id: new.previous_version_id,
            status: new.status,
            error_message: new.error_message,
            tokens_used: new.tokens_used,
            generation_time_ms: new.generation_time_ms,
            created_at: Utc::now(),
        };

        self.store.put_generation(&record)?;
        tracing::info!(
            "recorded {} generation {} (status={:?}, seed={:?})",
            record.document_type,
            record.id,
            record.status,
            record.seed
        );
        Ok(record)
    }

    /// Loads a generation by id.
    pub fn find_by_id(&self, id: &GenerationId) -> AuditResult<Option<GenerationRecord>> {
        self.store.get_generation(id)
    }

    /// Every generation sharing `fingerprint`, oldest first.
    pub fn find_by_fingerprint(&self, fingerprint: &Sha256Hash) -> AuditResult<Vec<GenerationRecord>> {
        Ok(self
            .store
            .list_generations()?
            .into_iter()
            .filter(|g| g.input_fingerprint.as_ref() == Some(fingerprint))
            .collect())
    }

    /// Every generation, oldest first.
    pub fn list(&self) -> AuditResult<Vec<GenerationRecord>> {
        self.store.list_generations()
    }
}

impl GenerationLookup for AuditRecorder {
    fn find_generation(&self, id: &GenerationId) -> AuditResult<Option<GenerationRecord>> {
        self.find_by_id(id)
    }
}
