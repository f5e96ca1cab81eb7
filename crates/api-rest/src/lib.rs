//! # API REST
//!
//! REST API implementation for chairside.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialization, CORS, status codes)
//!
//! Uses `api-shared` for caller identity and health checks.

#![warn(rust_2018_idioms)]

pub mod dto;
mod error;

pub use error::{ApiError, ErrorRes};

use axum::{
    extract::{Path as AxumPath, Request, State},
    http::HeaderMap,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use api_shared::{HealthRes, HealthService};
use chairside_core::cdt::{
    AgeGroup, CaseTier, CdtSelection, CodeRole, DiagnosticAssets, InsuranceTier, SelectedCode,
};
use chairside_core::requests::{
    Arches, Attachments, AreaTreated, Audience, CaseDifficulty, InsuranceSummaryRequest,
    MonitoringApproach, Tone, TreatmentSummaryRequest, TreatmentType,
};
use chairside_core::{
    ConfirmationEvaluator, DocumentService, DocumentType, GenerationId,
};
use chairside_types::NonEmptyText;
use dto::{
    ConfirmDocumentReq, ConfirmationRes, HistoryRes, InsuranceSummaryRes, TreatmentCdtCodes,
    TreatmentSummaryRes,
};

/// Application state shared across REST API handlers
#[derive(Clone)]
pub struct AppState {
    pub documents: DocumentService,
    pub confirmations: ConfirmationEvaluator,
    /// When set, every document endpoint requires a matching `x-api-key` header.
    pub api_key: Option<String>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        generate_treatment_summary,
        generate_insurance_summary,
        confirm_document,
        get_confirmation,
        get_history,
    ),
    components(schemas(
        HealthRes,
        ErrorRes,
        TreatmentSummaryRequest,
        TreatmentSummaryRes,
        TreatmentCdtCodes,
        InsuranceSummaryRequest,
        InsuranceSummaryRes,
        ConfirmDocumentReq,
        ConfirmationRes,
        HistoryRes,
        CaseTier,
        InsuranceTier,
        AgeGroup,
        Arches,
        MonitoringApproach,
        DiagnosticAssets,
        TreatmentType,
        AreaTreated,
        CaseDifficulty,
        Attachments,
        Audience,
        Tone,
        CdtSelection,
        SelectedCode,
        CodeRole,
    ))
)]
pub struct ApiDoc;

/// Builds the REST router with Swagger UI at `/swagger-ui`.
pub fn router(state: AppState) -> Router {
    let documents = Router::new()
        .route("/generate-treatment-summary", post(generate_treatment_summary))
        .route("/generate-insurance-summary", post(generate_insurance_summary))
        .route("/documents/:id/confirm", post(confirm_document))
        .route("/documents/:id/confirmation", get(get_confirmation))
        .route("/documents/:id/history", get(get_history))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/health", get(health))
        .merge(documents)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    match api_shared::validate_api_key(provided, state.api_key.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Resolves the caller from the `Authorization: Bearer` header.
///
/// Headers that are not bearer credentials are ignored, as if absent.
fn caller(headers: &HeaderMap) -> Result<NonEmptyText, ApiError> {
    let bearer = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| {
            let (scheme, token) = v.split_once(' ').unwrap_or((v, ""));
            scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
        });
    let user = api_shared::resolve_user(bearer)?;
    NonEmptyText::new(user).map_err(|_| ApiError::from(api_shared::AuthError::InvalidCredentials))
}

fn generation_id(raw: &str) -> Result<GenerationId, ApiError> {
    GenerationId::parse(raw).map_err(|_| ApiError::not_found(format!("Generation ID {} not found", raw)))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/generate-treatment-summary",
    request_body = TreatmentSummaryRequest,
    responses(
        (status = 200, description = "Treatment summary generated", body = TreatmentSummaryRes),
        (status = 400, description = "Invalid request", body = ErrorRes),
        (status = 401, description = "Invalid credentials", body = ErrorRes),
        (status = 500, description = "Generation failed", body = ErrorRes)
    )
)]
/// Generate a treatment summary for a dental case
///
/// Set `is_regeneration` and `previous_version_uuid` to ask for a different draft of an
/// earlier generation. Every attempt, failed or not, is recorded in the audit trail.
///
/// # Errors
/// - `400 Bad Request` if a field is out of range. A `previous_version_uuid` that names no
///   recorded generation is not an error: the draft is generated with a fresh regeneration seed.
/// - `500 Internal Server Error` if generation fails.
#[axum::debug_handler]
async fn generate_treatment_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TreatmentSummaryRequest>,
) -> Result<Json<TreatmentSummaryRes>, ApiError> {
    let user = caller(&headers)?;
    let doc = state
        .documents
        .generate(&req, user, None)
        .await
        .map_err(|e| ApiError::generation(DocumentType::TreatmentSummary, e))?;
    Ok(Json(TreatmentSummaryRes::new(&req, doc)))
}

#[utoipa::path(
    post,
    path = "/generate-insurance-summary",
    request_body = InsuranceSummaryRequest,
    responses(
        (status = 200, description = "Insurance summary generated", body = InsuranceSummaryRes),
        (status = 400, description = "Invalid request", body = ErrorRes),
        (status = 401, description = "Invalid credentials", body = ErrorRes),
        (status = 500, description = "Generation failed", body = ErrorRes)
    )
)]
/// Generate an administrative insurance summary
///
/// CDT codes are chosen from the tier, age group and flagged diagnostic assets, never by the
/// model. The summary is not a diagnosis, a claim or a promise of coverage.
#[axum::debug_handler]
async fn generate_insurance_summary(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<InsuranceSummaryRequest>,
) -> Result<Json<InsuranceSummaryRes>, ApiError> {
    let user = caller(&headers)?;
    let doc = state
        .documents
        .generate(&req, user, None)
        .await
        .map_err(|e| ApiError::generation(DocumentType::InsuranceSummary, e))?;
    Ok(Json(InsuranceSummaryRes::new(&req, doc)))
}

#[utoipa::path(
    post,
    path = "/documents/{id}/confirm",
    params(("id" = String, Path, description = "Generation id")),
    request_body = ConfirmDocumentReq,
    responses(
        (status = 200, description = "Document confirmed", body = ConfirmationRes),
        (status = 400, description = "Invalid request", body = ErrorRes),
        (status = 404, description = "Generation not found", body = ErrorRes),
        (status = 409, description = "Already confirmed", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Record the dentist's confirmation of a generated document
///
/// Send `confirmed_payload` only if the document was edited. A generation can be confirmed
/// once; later attempts get `409 Conflict` with the original `confirmed_at`.
#[axum::debug_handler]
async fn confirm_document(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    headers: HeaderMap,
    Json(req): Json<ConfirmDocumentReq>,
) -> Result<Json<ConfirmationRes>, ApiError> {
    let user = caller(&headers)?;
    let generation_id = generation_id(&id)?;
    let record = state
        .confirmations
        .confirm(&generation_id, user, req.confirmed_payload, req.notes)
        .map_err(|e| ApiError::from_audit(e, "Failed to confirm document"))?;
    Ok(Json(ConfirmationRes::new(
        record,
        "Document confirmed successfully",
    )))
}

#[utoipa::path(
    get,
    path = "/documents/{id}/confirmation",
    params(("id" = String, Path, description = "Generation id")),
    responses(
        (status = 200, description = "Existing confirmation", body = ConfirmationRes),
        (status = 404, description = "Not confirmed", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Confirmation status of a generated document
#[axum::debug_handler]
async fn get_confirmation(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<ConfirmationRes>, ApiError> {
    let generation_id = generation_id(&id)?;
    match state
        .confirmations
        .status(&generation_id)
        .map_err(|e| ApiError::from_audit(e, "Failed to read confirmation"))?
    {
        Some(record) => Ok(Json(ConfirmationRes::new(record, "Document is confirmed"))),
        None => Err(ApiError::not_found(format!(
            "Generation ID {} has not been confirmed",
            generation_id
        ))),
    }
}

#[utoipa::path(
    get,
    path = "/documents/{id}/history",
    params(("id" = String, Path, description = "Generation id")),
    responses(
        (status = 200, description = "Regeneration history", body = HistoryRes),
        (status = 404, description = "Generation not found", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Regeneration history of a generated document, oldest first
#[axum::debug_handler]
async fn get_history(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<HistoryRes>, ApiError> {
    let generation_id = generation_id(&id)?;
    let exists = state
        .documents
        .recorder()
        .find_by_id(&generation_id)
        .map_err(|e| ApiError::from_audit(e, "Failed to read generation"))?
        .is_some();
    if !exists {
        return Err(ApiError::not_found(format!(
            "Generation ID {} not found",
            generation_id
        )));
    }
    Ok(Json(HistoryRes {
        history: state
            .confirmations
            .history(&generation_id)
            .iter()
            .map(GenerationId::to_string)
            .collect(),
        generation_id: generation_id.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as HttpRequest, StatusCode};
    use chairside_core::cdt::CdtTable;
    use chairside_core::llm::ScriptedLlm;
    use chairside_core::redaction::RedactionPolicy;
    use chairside_core::store::MemoryStore;
    use chairside_core::CoreConfig;
    use serde_json::{json, Value};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(api_key: Option<&str>) -> Router {
        let cfg = Arc::new(
            CoreConfig::new(
                PathBuf::from("/tmp/unused"),
                RedactionPolicy::StoreFull,
                42,
                42,
                "gpt-4o".into(),
                100,
            )
            .unwrap(),
        );
        let store = Arc::new(MemoryStore::new());
        let documents = DocumentService::new(
            cfg.clone(),
            store.clone(),
            Arc::new(ScriptedLlm::new()),
            Arc::new(CdtTable::embedded().unwrap()),
        );
        router(AppState {
            documents,
            confirmations: ConfirmationEvaluator::new(cfg, store),
            api_key: api_key.map(str::to_string),
        })
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header("authorization", "Bearer abcdefghijkl");
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(None), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_insurance_generation_and_confirmation_flow() {
        let app = app(None);
        let (status, first) = call(
            &app,
            "POST",
            "/generate-insurance-summary",
            Some(json!({"tier": "moderate", "age_group": "adult", "diagnostic_assets": {"fmx": true}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["seed"], 42);
        assert_eq!(first["cdt_codes"], json!(["D8090", "D0210"]));
        assert_eq!(first["metadata"]["tier"], "moderate");
        let id = first["uuid"].as_str().unwrap().to_string();

        let (status, second) = call(
            &app,
            "POST",
            "/generate-insurance-summary",
            Some(json!({
                "tier": "moderate",
                "age_group": "adult",
                "diagnostic_assets": {"fmx": true},
                "is_regeneration": true,
                "previous_version_uuid": id,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["seed"], 43);
        assert_eq!(second["is_regenerated"], true);
        let second_id = second["uuid"].as_str().unwrap().to_string();

        let (status, history) =
            call(&app, "GET", &format!("/documents/{}/history", second_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["history"], json!([id, second_id]));

        let (status, confirmed) = call(
            &app,
            "POST",
            &format!("/documents/{}/confirm", second_id),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["user_id"], "user_abcdefgh");
        assert_eq!(confirmed["is_edited"], false);
        assert_eq!(confirmed["similarity_score"], 1.0);

        let (status, conflict) = call(
            &app,
            "POST",
            &format!("/documents/{}/confirm", second_id),
            Some(json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(conflict["confirmed_at"], confirmed["confirmed_at"]);

        let (status, existing) =
            call(&app, "GET", &format!("/documents/{}/confirmation", second_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(existing["confirmation_id"], confirmed["confirmation_id"]);
    }

    #[tokio::test]
    async fn test_edited_treatment_confirmation() {
        let app = app(None);
        let (status, generated) = call(
            &app,
            "POST",
            "/generate-treatment-summary",
            Some(json!({"tier": "mild", "patient_age": 30})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(generated["cdt_codes"]["primary_code"], "D8010");
        let id = generated["uuid"].as_str().unwrap();

        let (status, confirmed) = call(
            &app,
            "POST",
            &format!("/documents/{}/confirm", id),
            Some(json!({
                "confirmed_payload": {"title": "Plan", "summary": "Rewritten by the dentist."},
                "notes": "Shortened",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(confirmed["is_edited"], true);
        assert_eq!(confirmed["edited_summary"], "Rewritten by the dentist.");
        assert!(confirmed["similarity_score"].as_f64().unwrap() < 1.0);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app(None);
        let missing = GenerationId::new();

        let (status, _) = call(&app, "POST", &format!("/documents/{}/confirm", missing), Some(json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", &format!("/documents/{}/confirmation", missing), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/documents/not-an-id/history", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &app,
            "POST",
            "/generate-treatment-summary",
            Some(json!({"patient_age": 200})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("patient_age"));

        let (status, body) = call(
            &app,
            "POST",
            "/generate-treatment-summary",
            Some(json!({"is_regeneration": true, "previous_version_uuid": "bogus"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["seed"], 43);
        assert_eq!(body["is_regenerated"], true);
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let app = app(Some("secret"));
        let (status, _) = call(&app, "POST", "/generate-treatment-summary", Some(json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);

        let request = HttpRequest::builder()
            .method("POST")
            .uri("/generate-treatment-summary")
            .header("x-api-key", "secret")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
