//! Document generation.
//!
//! [`DocumentService`] runs one generation end to end: validate the request, choose a seed,
//! call the model, normalise the output, pick billing codes and record the attempt. Failed
//! attempts are recorded too, with the seed and regeneration linkage they would have used.

use crate::cdt::{CdtSelection, CdtTable};
use crate::config::CoreConfig;
use crate::llm::{LlmClient, LlmRequest, LlmResponse};
use crate::model::{GenerationId, GenerationStatus};
use crate::recorder::{AuditRecorder, NewGeneration};
use crate::requests::DocumentRequest;
use crate::seed::{choose_seed, SeedRequest};
use crate::store::AuditStore;
use crate::{AuditError, AuditResult};
use chairside_types::NonEmptyText;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// A successfully generated and recorded document.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedDocument {
    pub generation_id: GenerationId,
    pub output: Map<String, Value>,
    pub seed: i64,
    pub tokens_used: u32,
    pub generation_time_ms: u64,
    pub document_version: String,
    pub is_regenerated: bool,
    pub previous_version_id: Option<GenerationId>,
    pub cdt: Option<CdtSelection>,
}

/// Generates documents and records every attempt.
#[derive(Clone)]
pub struct DocumentService {
    cfg: Arc<CoreConfig>,
    recorder: AuditRecorder,
    llm: Arc<dyn LlmClient>,
    cdt: Arc<CdtTable>,
}

impl DocumentService {
    pub fn new(
        cfg: Arc<CoreConfig>,
        store: Arc<dyn AuditStore>,
        llm: Arc<dyn LlmClient>,
        cdt: Arc<CdtTable>,
    ) -> Self {
        let recorder = AuditRecorder::new(cfg.clone(), store);
        Self {
            cfg,
            recorder,
            llm,
            cdt,
        }
    }

    pub fn recorder(&self) -> &AuditRecorder {
        &self.recorder
    }

    /// Generates a document for `request` on behalf of `user_id`.
    ///
    /// # Arguments
    ///
    /// * `request` - Case details, including the regeneration control fields.
    /// * `user_id` - Caller the generation is attributed to.
    /// * `seed_override` - Seed to use instead of the sequenced one.
    ///
    /// # Returns
    ///
    /// The normalised output together with the id it was recorded under.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the request fails validation. Nothing is recorded in this case.
    ///   A malformed previous id is not an error: the generation proceeds as a regeneration
    ///   with no resolvable prior.
    /// - `Generation` if the model call or output handling fails. An error record is written
    ///   before returning.
    /// - A storage error if the successful generation cannot be recorded.
    pub async fn generate<R: DocumentRequest>(
        &self,
        request: &R,
        user_id: NonEmptyText,
        seed_override: Option<i64>,
    ) -> AuditResult<GeneratedDocument> {
        request.validate()?;
        let previous_version_id = request.previous_version_id();
        let input = serde_json::to_value(request).map_err(AuditError::Serialization)?;

        let document_type = R::DOCUMENT_TYPE;
        let is_regenerated = request.is_regeneration();
        let choice = choose_seed(
            &SeedRequest {
                seed_override,
                is_regeneration: request.is_regeneration(),
                previous_version_id: previous_version_id.as_ref(),
            },
            self.cfg.default_seed(document_type),
            &self.recorder,
        );

        let sampling = request.sampling();
        let llm_request = LlmRequest {
            model: self.cfg.model().to_string(),
            system_prompt: request.system_prompt().to_string(),
            user_prompt: request.user_prompt(),
            temperature: sampling.temperature,
            max_tokens: sampling.max_tokens,
            seed: choice.seed,
            schema_name: R::SCHEMA_NAME,
            schema: request.output_schema(),
        };

        let started = Instant::now();
        let outcome = self
            .llm
            .complete(&llm_request)
            .await
            .and_then(|LlmResponse { content, tokens_used }| {
                Ok((request.finish_output(content)?, tokens_used))
            });
        let generation_time_ms = started.elapsed().as_millis() as u64;

        let (output, tokens_used) = match outcome {
            Ok(done) => done,
            Err(e) => {
                let message = e.to_string();
                tracing::error!("{} generation failed: {}", document_type, message);
                let failed = NewGeneration {
                    user_id,
                    document_type,
                    input,
                    output: Value::Object(Map::new()),
                    seed: Some(choice.seed),
                    is_regenerated,
                    previous_version_id,
                    status: GenerationStatus::Error,
                    error_message: Some(message.clone()),
                    tokens_used: None,
                    generation_time_ms: Some(generation_time_ms),
                };
                if let Err(record_err) = self.recorder.record(failed) {
                    tracing::error!(
                        "failed to record failed {} generation: {}",
                        document_type,
                        record_err
                    );
                }
                return Err(AuditError::Generation(message));
            }
        };

        let cdt = request.billing_codes(&self.cdt);
        let record = self.recorder.record(NewGeneration {
            user_id,
            document_type,
            input,
            output: Value::Object(output.clone()),
            seed: Some(choice.seed),
            is_regenerated,
            previous_version_id: previous_version_id.clone(),
            status: GenerationStatus::Success,
            error_message: None,
            tokens_used: Some(tokens_used),
            generation_time_ms: Some(generation_time_ms),
        })?;

        Ok(GeneratedDocument {
            generation_id: record.id,
            output,
            seed: choice.seed,
            tokens_used,
            generation_time_ms,
            document_version: record.document_version,
            is_regenerated,
            previous_version_id,
            cdt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdt::{AgeGroup, InsuranceTier};
    use crate::fingerprint::fingerprint;
    use crate::llm::ScriptedLlm;
    use crate::redaction::RedactionPolicy;
    use crate::document::DocumentType;
    use crate::requests::{request_fingerprint, InsuranceSummaryRequest, TreatmentSummaryRequest};
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn service(llm: Arc<dyn LlmClient>) -> (DocumentService, Arc<MemoryStore>) {
        let cfg = CoreConfig::new(
            PathBuf::from("/tmp/unused"),
            RedactionPolicy::StoreFull,
            42,
            7,
            "gpt-4o".into(),
            100,
        )
        .unwrap();
        let store = Arc::new(MemoryStore::new());
        let cdt = Arc::new(CdtTable::embedded().unwrap());
        let service = DocumentService::new(Arc::new(cfg), store.clone(), llm, cdt);
        (service, store)
    }

    fn user() -> NonEmptyText {
        NonEmptyText::new("dev_user_001").unwrap()
    }

    #[tokio::test]
    async fn test_first_generation_uses_default_seed_and_records_success() {
        let llm = Arc::new(ScriptedLlm::new());
        let (service, store) = service(llm.clone());
        let request = InsuranceSummaryRequest::new(InsuranceTier::Moderate, AgeGroup::Adult);

        let doc = service.generate(&request, user(), None).await.unwrap();

        assert_eq!(doc.seed, 7);
        assert!(!doc.is_regenerated);
        assert_eq!(doc.document_version, "1.0");
        assert_eq!(doc.cdt.unwrap().code_strings(), vec!["D8090"]);
        assert!(doc.output["disclaimer"].as_str().is_some());

        let sent = &llm.requests()[0];
        assert_eq!(sent.temperature, 0.5);
        assert_eq!(sent.max_tokens, 1500);
        assert_eq!(sent.schema_name, "insurance_summary");

        let record = store.get_generation(&doc.generation_id).unwrap().unwrap();
        assert_eq!(record.status, GenerationStatus::Success);
        assert_eq!(record.seed, Some(7));
        assert_eq!(record.tokens_used, Some(doc.tokens_used));
    }

    #[tokio::test]
    async fn test_regeneration_increments_seed_and_keeps_fingerprint() {
        let (service, store) = service(Arc::new(ScriptedLlm::new()));
        let mut request = TreatmentSummaryRequest {
            patient_age: Some(25),
            ..Default::default()
        };
        let first = service.generate(&request, user(), None).await.unwrap();

        request.is_regeneration = true;
        request.previous_version_uuid = Some(first.generation_id.to_string());
        let second = service.generate(&request, user(), None).await.unwrap();

        assert_eq!(first.seed, 42);
        assert_eq!(second.seed, 43);
        assert!(second.is_regenerated);
        assert_eq!(second.previous_version_id, Some(first.generation_id.clone()));
        assert_ne!(first.output["summary"], second.output["summary"]);

        let a = store.get_generation(&first.generation_id).unwrap().unwrap();
        let b = store.get_generation(&second.generation_id).unwrap().unwrap();
        assert_eq!(a.input_fingerprint, b.input_fingerprint);
        assert_eq!(
            a.input_fingerprint,
            Some(fingerprint(&serde_json::to_value(&request).unwrap()))
        );
    }

    #[tokio::test]
    async fn test_stored_fingerprint_matches_raw_request_body() {
        let (service, store) = service(Arc::new(ScriptedLlm::new()));
        let body = r#"{"tier": "moderate", "patient_age": 25}"#;
        let request: TreatmentSummaryRequest = serde_json::from_str(body).unwrap();

        let doc = service.generate(&request, user(), None).await.unwrap();
        let record = store.get_generation(&doc.generation_id).unwrap().unwrap();
        assert_eq!(
            record.input_fingerprint,
            Some(request_fingerprint(DocumentType::TreatmentSummary, body).unwrap())
        );
    }

    #[tokio::test]
    async fn test_seed_override_wins() {
        let (service, _) = service(Arc::new(ScriptedLlm::new()));
        let doc = service
            .generate(&TreatmentSummaryRequest::default(), user(), Some(1234))
            .await
            .unwrap();
        assert_eq!(doc.seed, 1234);
        assert!(doc.cdt.is_none());
    }

    #[tokio::test]
    async fn test_failed_generation_is_recorded_with_linkage() {
        let (service, store) = service(Arc::new(ScriptedLlm::failing("upstream timeout")));
        let previous = GenerationId::new();
        let request = TreatmentSummaryRequest {
            is_regeneration: true,
            previous_version_uuid: Some(previous.to_string()),
            ..Default::default()
        };

        let err = service.generate(&request, user(), None).await.unwrap_err();
        assert!(matches!(&err, AuditError::Generation(msg) if msg.contains("upstream timeout")));

        let records = store.list_generations().unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.status, GenerationStatus::Error);
        assert_eq!(record.output_payload.as_str(), "{}");
        assert_eq!(record.seed, Some(43));
        assert!(record.is_regenerated);
        assert_eq!(record.previous_version_id, Some(previous));
        assert!(record.error_message.as_deref().unwrap().contains("upstream timeout"));
        assert_eq!(
            record.input_fingerprint,
            Some(fingerprint(&serde_json::to_value(&request).unwrap()))
        );
    }

    #[tokio::test]
    async fn test_unresolvable_previous_id_falls_back_to_default_plus_one() {
        let llm = Arc::new(ScriptedLlm::new());
        let (service, store) = service(llm.clone());
        let request = TreatmentSummaryRequest {
            is_regeneration: true,
            previous_version_uuid: Some("550e8400-e29b-41d4-a716-446655440000".into()),
            ..Default::default()
        };

        let doc = service.generate(&request, user(), None).await.unwrap();
        assert_eq!(doc.seed, 43);
        assert!(doc.is_regenerated);
        assert_eq!(doc.previous_version_id, None);
        assert_eq!(llm.requests()[0].seed, 43);

        let records = store.list_generations().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].seed, Some(43));
        assert!(records[0].is_regenerated);
        assert!(records[0]
            .input_payload
            .as_str()
            .contains("550e8400-e29b-41d4-a716-446655440000"));
    }

    #[tokio::test]
    async fn test_invalid_request_is_not_recorded() {
        let llm = Arc::new(ScriptedLlm::new());
        let (service, store) = service(llm.clone());
        let request = TreatmentSummaryRequest {
            patient_age: Some(200),
            ..Default::default()
        };

        let err = service.generate(&request, user(), None).await.unwrap_err();
        assert!(matches!(err, AuditError::InvalidInput(_)));
        assert!(store.list_generations().unwrap().is_empty());
        assert!(llm.requests().is_empty());
    }
}
