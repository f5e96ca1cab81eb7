//! Clinician confirmation of generated documents.
//!
//! Confirming a generation records who approved it, whether the approved text differs from
//! what the model produced, how similar the two are and the regeneration chain that led to it.
//! Each generation can be confirmed once.

use crate::config::CoreConfig;
use crate::constants::MAX_CONFIRMATION_NOTES_CHARS;
use crate::history::build_history;
use crate::model::{ConfirmationId, ConfirmationRecord, EditedSummary, GenerationId};
use crate::recorder::AuditRecorder;
use crate::similarity::similarity;
use crate::store::AuditStore;
use crate::{AuditError, AuditResult};
use chairside_types::NonEmptyText;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Evaluates and records confirmations.
#[derive(Clone)]
pub struct ConfirmationEvaluator {
    cfg: Arc<CoreConfig>,
    recorder: AuditRecorder,
    store: Arc<dyn AuditStore>,
}

/// Edit detection result for one confirmation.
#[derive(Clone, Debug, PartialEq)]
pub struct EditAssessment {
    pub is_edited: bool,
    pub similarity_score: Option<f64>,
    pub original_text: Option<String>,
    pub approved_text: Option<String>,
}

impl ConfirmationEvaluator {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn AuditStore>) -> Self {
        let recorder = AuditRecorder::new(cfg.clone(), store.clone());
        Self {
            cfg,
            recorder,
            store,
        }
    }

    /// Records a clinician's approval of a generation.
    ///
    /// # Arguments
    ///
    /// * `generation_id` - Generation being approved.
    /// * `user_id` - Clinician approving it.
    /// * `confirmed_payload` - The document as approved, if it was edited. An empty object is
    ///   treated as absent.
    /// * `notes` - Free-text notes, at most 1000 characters. Blank notes are dropped.
    ///
    /// # Returns
    ///
    /// The stored confirmation record.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the generation does not exist.
    /// - `Conflict` if it has already been confirmed, including by a concurrent caller.
    /// - `InvalidInput` if `notes` is too long.
    pub fn confirm(
        &self,
        generation_id: &GenerationId,
        user_id: NonEmptyText,
        confirmed_payload: Option<Value>,
        notes: Option<String>,
    ) -> AuditResult<ConfirmationRecord> {
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if let Some(notes) = &notes {
            if notes.chars().count() > MAX_CONFIRMATION_NOTES_CHARS {
                return Err(AuditError::InvalidInput(format!(
                    "notes must be at most {} characters",
                    MAX_CONFIRMATION_NOTES_CHARS
                )));
            }
        }

        let generation =
            self.recorder
                .find_by_id(generation_id)?
                .ok_or_else(|| AuditError::NotFound {
                    generation_id: generation_id.to_string(),
                })?;

        if let Some(existing) = self.store.get_confirmation(generation_id)? {
            return Err(AuditError::Conflict {
                generation_id: generation_id.to_string(),
                confirmed_at: existing.confirmed_at,
            });
        }

        let confirmed_payload = confirmed_payload.filter(|p| !is_empty_object(p));
        let original = generation.output_payload.to_object();
        let assessment = assess_edit(
            generation.document_type,
            &original,
            confirmed_payload.as_ref(),
        );

        let policy = self.cfg.redaction();
        let edited_summary = match (&assessment.original_text, &assessment.approved_text) {
            (Some(before), Some(after)) if assessment.is_edited => {
                let pair = EditedSummary {
                    before: before.clone(),
                    after: after.clone(),
                };
                let value = serde_json::to_value(&pair).map_err(AuditError::Serialization)?;
                Some(policy.apply(&value))
            }
            _ => None,
        };

        let record = ConfirmationRecord {
            id: ConfirmationId::new(),
            generation_id: generation.id.clone(),
            user_id,
            document_type: generation.document_type,
            document_version: generation.document_type.document_version().to_string(),
            confirmed_payload: confirmed_payload.as_ref().map(|p| policy.apply(p)),
            is_edited: assessment.is_edited,
            edited_summary,
            similarity_score: assessment.similarity_score,
            regeneration_history: build_history(
                &generation.id,
                &self.recorder,
                self.cfg.history_max_depth(),
            ),
            notes,
            confirmed_at: Utc::now(),
        };

        self.store.insert_confirmation(&record)?;
        tracing::info!(
            "confirmed {} generation {} (edited={}, similarity={:?})",
            record.document_type,
            record.generation_id,
            record.is_edited,
            record.similarity_score
        );
        Ok(record)
    }

    /// The confirmation for a generation, if any.
    pub fn status(&self, generation_id: &GenerationId) -> AuditResult<Option<ConfirmationRecord>> {
        self.store.get_confirmation(generation_id)
    }

    pub fn is_confirmed(&self, generation_id: &GenerationId) -> AuditResult<bool> {
        Ok(self.status(generation_id)?.is_some())
    }

    /// Version chain for a generation, oldest first.
    pub fn history(&self, generation_id: &GenerationId) -> Vec<GenerationId> {
        build_history(generation_id, &self.recorder, self.cfg.history_max_depth())
    }
}

fn is_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if map.is_empty())
}

/// Compares the generated output with the approved payload.
///
/// Texts are compared exactly; similarity is computed on trimmed text. When a payload was
/// submitted but neither side carries comparable text, the document counts as edited.
pub fn assess_edit(
    document_type: crate::DocumentType,
    original: &Map<String, Value>,
    confirmed_payload: Option<&Value>,
) -> EditAssessment {
    let shape = document_type.payload_shape();
    let original_text = shape.comparable_text(original).map(str::to_string);

    let empty = Map::new();
    let approved = match confirmed_payload {
        Some(Value::Object(map)) => map,
        Some(_) => &empty,
        None => original,
    };
    let approved_text = shape.comparable_text(approved).map(str::to_string);

    let is_edited = match (&original_text, &approved_text) {
        (Some(before), Some(after)) => before != after,
        (None, None) => confirmed_payload.is_some(),
        _ => false,
    };
    let similarity_score = match (&original_text, &approved_text) {
        (Some(before), Some(after)) => similarity(before, after),
        _ => None,
    };

    EditAssessment {
        is_edited,
        similarity_score,
        original_text,
        approved_text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentType;
    use crate::model::{GenerationStatus, StoredPayload};
    use crate::recorder::NewGeneration;
    use crate::redaction::RedactionPolicy;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::path::PathBuf;

    struct Fixture {
        recorder: AuditRecorder,
        evaluator: ConfirmationEvaluator,
    }

    fn fixture(policy: RedactionPolicy) -> Fixture {
        let cfg = Arc::new(
            CoreConfig::new(
                PathBuf::from("/tmp/unused"),
                policy,
                42,
                42,
                "gpt-4o".into(),
                100,
            )
            .unwrap(),
        );
        let store: Arc<dyn AuditStore> = Arc::new(MemoryStore::new());
        Fixture {
            recorder: AuditRecorder::new(cfg.clone(), store.clone()),
            evaluator: ConfirmationEvaluator::new(cfg, store),
        }
    }

    fn user() -> NonEmptyText {
        NonEmptyText::new("dev_user_001").unwrap()
    }

    fn record_insurance(recorder: &AuditRecorder, text: &str, previous: Option<GenerationId>) -> GenerationId {
        recorder
            .record(NewGeneration {
                user_id: user(),
                document_type: DocumentType::InsuranceSummary,
                input: json!({"case_tier": "moderate", "patient_age": 25}),
                output: json!({"insurance_summary": text, "cdt_codes": ["D8090"]}),
                seed: Some(42),
                is_regenerated: previous.is_some(),
                previous_version_id: previous,
                status: GenerationStatus::Success,
                error_message: None,
                tokens_used: Some(200),
                generation_time_ms: Some(900),
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_confirm_unchanged_document() {
        let f = fixture(RedactionPolicy::StoreFull);
        let id = record_insurance(&f.recorder, "Comprehensive orthodontic treatment.", None);

        let record = f.evaluator.confirm(&id, user(), None, None).unwrap();
        assert!(!record.is_edited);
        assert_eq!(record.similarity_score, Some(1.0));
        assert!(record.regeneration_history.is_empty());
        assert_eq!(record.confirmed_payload, None);
        assert_eq!(record.edited_summary, None);
        assert_eq!(record.document_version, "1.0");
        assert!(f.evaluator.is_confirmed(&id).unwrap());
    }

    #[test]
    fn test_confirm_edited_document_keeps_before_and_after() {
        let f = fixture(RedactionPolicy::StoreFull);
        let first = record_insurance(&f.recorder, "Draft one.", None);
        let second = record_insurance(&f.recorder, "Draft two.", Some(first.clone()));

        let record = f
            .evaluator
            .confirm(
                &second,
                user(),
                Some(json!({"insurance_summary": "Draft two, edited."})),
                Some("  tidied wording ".into()),
            )
            .unwrap();

        assert!(record.is_edited);
        let score = record.similarity_score.unwrap();
        assert!(score > 0.0 && score < 1.0);
        assert_eq!(record.regeneration_history, vec![first, second]);
        assert_eq!(record.edited_text().as_deref(), Some("Draft two, edited."));
        assert_eq!(record.notes.as_deref(), Some("tidied wording"));
        assert!(record.confirmed_payload.is_some());
    }

    #[test]
    fn test_confirm_missing_generation_is_not_found() {
        let f = fixture(RedactionPolicy::StoreFull);
        let missing = GenerationId::new();
        match f.evaluator.confirm(&missing, user(), None, None) {
            Err(AuditError::NotFound { generation_id }) => {
                assert_eq!(generation_id, missing.to_string())
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_second_confirmation_conflicts() {
        let f = fixture(RedactionPolicy::StoreFull);
        let id = record_insurance(&f.recorder, "Text.", None);
        let first = f.evaluator.confirm(&id, user(), None, None).unwrap();

        let err = f.evaluator.confirm(&id, user(), None, None).unwrap_err();
        match &err {
            AuditError::Conflict { confirmed_at, .. } => {
                assert_eq!(*confirmed_at, first.confirmed_at)
            }
            other => panic!("expected Conflict, got {:?}", other),
        }
        assert!(err.to_string().starts_with("Document already confirmed at"));
    }

    #[test]
    fn test_notes_length_is_limited() {
        let f = fixture(RedactionPolicy::StoreFull);
        let id = record_insurance(&f.recorder, "Text.", None);
        let notes = "x".repeat(MAX_CONFIRMATION_NOTES_CHARS + 1);
        assert!(matches!(
            f.evaluator.confirm(&id, user(), None, Some(notes)),
            Err(AuditError::InvalidInput(_))
        ));
        assert!(!f.evaluator.is_confirmed(&id).unwrap());
    }

    #[test]
    fn test_empty_payload_counts_as_absent() {
        let f = fixture(RedactionPolicy::StoreFull);
        let id = record_insurance(&f.recorder, "Text.", None);
        let record = f
            .evaluator
            .confirm(&id, user(), Some(json!({})), None)
            .unwrap();
        assert!(!record.is_edited);
        assert_eq!(record.confirmed_payload, None);
    }

    #[test]
    fn test_minimal_policy_marks_payload_edits_without_text() {
        let f = fixture(RedactionPolicy::Minimal);
        let id = record_insurance(&f.recorder, "Text.", None);
        let record = f
            .evaluator
            .confirm(&id, user(), Some(json!({"notes_only": true})), None)
            .unwrap();
        assert!(record.is_edited);
        assert_eq!(record.similarity_score, None);
        let stored = record.confirmed_payload.unwrap().to_object();
        assert_eq!(stored["stored"], false);
    }

    #[test]
    fn test_assess_edit_rules() {
        let original = json!({"summary": "abc"});
        let original = original.as_object().unwrap();

        let same = assess_edit(DocumentType::ProgressNotes, original, None);
        assert!(!same.is_edited);
        assert_eq!(same.similarity_score, Some(1.0));

        let one_sided = assess_edit(
            DocumentType::ProgressNotes,
            original,
            Some(&json!({"other": "x"})),
        );
        assert!(!one_sided.is_edited);
        assert_eq!(one_sided.similarity_score, None);

        let empty = Map::new();
        let neither = assess_edit(
            DocumentType::ProgressNotes,
            &empty,
            Some(&json!({"other": "x"})),
        );
        assert!(neither.is_edited);

        let unsubmitted = assess_edit(DocumentType::ProgressNotes, &empty, None);
        assert!(!unsubmitted.is_edited);

        let padded = assess_edit(
            DocumentType::ProgressNotes,
            original,
            Some(&json!({"summary": " abc "})),
        );
        assert!(padded.is_edited);
        assert_eq!(padded.similarity_score, Some(1.0));
    }

    #[test]
    fn test_stored_payload_parse_failure_is_tolerated() {
        let original = StoredPayload::new("{broken").to_object();
        let outcome = assess_edit(DocumentType::TreatmentSummary, &original, None);
        assert!(!outcome.is_edited);
        assert_eq!(outcome.original_text, None);
    }
}
