//! Generate, regenerate and confirm against a file-backed audit store.

use chairside_core::cdt::CdtTable;
use chairside_core::llm::ScriptedLlm;
use chairside_core::model::{EditedSummary, GenerationStatus};
use chairside_core::redaction::RedactionPolicy;
use chairside_core::requests::TreatmentSummaryRequest;
use chairside_core::store::{AuditStore, FileStore};
use chairside_core::{AuditError, ConfirmationEvaluator, CoreConfig, DocumentService};
use chairside_types::NonEmptyText;
use serde_json::json;
use std::sync::Arc;

struct Harness {
    _dir: tempfile::TempDir,
    store: Arc<FileStore>,
    documents: DocumentService,
    confirmations: ConfirmationEvaluator,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Arc::new(
        CoreConfig::new(
            dir.path().to_path_buf(),
            RedactionPolicy::StoreFull,
            42,
            42,
            "gpt-4o".into(),
            100,
        )
        .unwrap(),
    );
    let store = Arc::new(FileStore::open(dir.path()).unwrap());
    let documents = DocumentService::new(
        cfg.clone(),
        store.clone(),
        Arc::new(ScriptedLlm::new()),
        Arc::new(CdtTable::embedded().unwrap()),
    );
    let confirmations = ConfirmationEvaluator::new(cfg, store.clone());
    Harness {
        _dir: dir,
        store,
        documents,
        confirmations,
    }
}

fn dentist() -> NonEmptyText {
    NonEmptyText::new("user_dr_smith").unwrap()
}

fn adult_moderate_case() -> TreatmentSummaryRequest {
    TreatmentSummaryRequest {
        tier: Some(chairside_core::cdt::CaseTier::Moderate),
        patient_age: Some(25),
        ..Default::default()
    }
}

#[tokio::test]
async fn regeneration_and_confirmation_lifecycle() {
    let h = harness();

    // First draft uses the default seed.
    let first = h
        .documents
        .generate(&adult_moderate_case(), dentist(), None)
        .await
        .unwrap();
    assert_eq!(first.seed, 42);
    assert!(!first.is_regenerated);
    assert_eq!(first.cdt.as_ref().unwrap().code_strings(), vec!["D8090"]);
    let first_record = h.store.get_generation(&first.generation_id).unwrap().unwrap();
    assert_eq!(first_record.status, GenerationStatus::Success);

    // Regeneration moves to the next seed and keeps the fingerprint.
    let regenerate = TreatmentSummaryRequest {
        is_regeneration: true,
        previous_version_uuid: Some(first.generation_id.to_string()),
        ..adult_moderate_case()
    };
    let second = h
        .documents
        .generate(&regenerate, dentist(), None)
        .await
        .unwrap();
    assert_eq!(second.seed, 43);
    assert!(second.is_regenerated);
    assert_eq!(second.previous_version_id.as_ref(), Some(&first.generation_id));
    let second_record = h.store.get_generation(&second.generation_id).unwrap().unwrap();
    assert_eq!(second_record.input_fingerprint, first_record.input_fingerprint);

    let related = h
        .documents
        .recorder()
        .find_by_fingerprint(first_record.input_fingerprint.as_ref().unwrap())
        .unwrap();
    assert_eq!(related.len(), 2);

    // Unchanged approval of the first draft.
    let confirmed = h
        .confirmations
        .confirm(&first.generation_id, dentist(), None, None)
        .unwrap();
    assert!(!confirmed.is_edited);
    assert_eq!(confirmed.similarity_score, Some(1.0));
    assert!(confirmed.regeneration_history.is_empty());

    // Edited approval of the regenerated draft.
    let original_summary = second.output["summary"].as_str().unwrap().to_string();
    let edited_summary = format!("{} Reviewed with the patient.", original_summary);
    let edited = h
        .confirmations
        .confirm(
            &second.generation_id,
            dentist(),
            Some(json!({"title": second.output["title"], "summary": edited_summary})),
            Some("  Added review note  ".into()),
        )
        .unwrap();
    assert!(edited.is_edited);
    let score = edited.similarity_score.unwrap();
    assert!(score < 1.0 && score > 0.5);
    let pair: EditedSummary =
        serde_json::from_str(edited.edited_summary.as_ref().unwrap().as_str()).unwrap();
    assert_eq!(pair.before, original_summary);
    assert_eq!(pair.after, edited_summary);
    assert_eq!(edited.notes.as_deref(), Some("Added review note"));
    assert_eq!(
        edited.regeneration_history,
        vec![first.generation_id.clone(), second.generation_id.clone()]
    );

    // A second approval conflicts and leaves the first untouched.
    let err = h
        .confirmations
        .confirm(&first.generation_id, dentist(), None, None)
        .unwrap_err();
    match err {
        AuditError::Conflict { confirmed_at, .. } => {
            assert_eq!(confirmed_at, confirmed.confirmed_at)
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(
        h.confirmations.status(&first.generation_id).unwrap(),
        Some(confirmed)
    );
}

#[tokio::test]
async fn records_survive_reopening_the_store() {
    let h = harness();
    let doc = h
        .documents
        .generate(&adult_moderate_case(), dentist(), None)
        .await
        .unwrap();
    h.confirmations
        .confirm(&doc.generation_id, dentist(), None, None)
        .unwrap();

    let reopened = FileStore::open(h.store.data_dir()).unwrap();
    assert!(reopened.get_generation(&doc.generation_id).unwrap().is_some());
    assert!(reopened.get_confirmation(&doc.generation_id).unwrap().is_some());
    assert_eq!(reopened.list_generations().unwrap().len(), 1);
}

#[test]
fn confirming_unknown_generation_is_not_found() {
    let h = harness();
    let missing = chairside_core::GenerationId::new();
    let err = h
        .confirmations
        .confirm(&missing, dentist(), None, None)
        .unwrap_err();
    assert!(matches!(err, AuditError::NotFound { .. }));
}
