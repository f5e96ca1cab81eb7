use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use chairside_core::cdt::CdtTable;
use chairside_core::config::{
    history_depth_from_env_value, model_from_env_value, redaction_policy_from_env_values,
    seed_from_env_value,
};
use chairside_core::constants::{DEFAULT_DATA_DIR, DEFAULT_SEED};
use chairside_core::llm::{LlmClient, OpenAiClient, ScriptedLlm};
use chairside_core::store::FileStore;
use chairside_core::{ConfirmationEvaluator, CoreConfig, DocumentService};

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Builds the core configuration from the process environment.
///
/// # Errors
/// Returns an error if a seed, boolean switch or depth limit cannot be parsed.
fn core_config_from_env() -> anyhow::Result<CoreConfig> {
    let data_dir = env("CHAIRSIDE_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into());
    let redaction = redaction_policy_from_env_values(
        env("STORE_FULL_AUDIT_DATA"),
        env("REDACT_PHI_FIELDS"),
        env("PHI_FIELDS"),
    )?;
    Ok(CoreConfig::new(
        PathBuf::from(data_dir),
        redaction,
        seed_from_env_value(
            "TREATMENT_SUMMARY_SEED",
            env("TREATMENT_SUMMARY_SEED"),
            DEFAULT_SEED,
        )?,
        seed_from_env_value(
            "INSURANCE_SUMMARY_SEED",
            env("INSURANCE_SUMMARY_SEED"),
            DEFAULT_SEED,
        )?,
        model_from_env_value(env("OPENAI_MODEL")),
        history_depth_from_env_value(env("HISTORY_MAX_DEPTH"))?,
    )?)
}

/// Main entry point for chairside
///
/// Serves the REST API with OpenAPI/Swagger UI at `/swagger-ui`.
///
/// # Environment Variables
/// - `CHAIRSIDE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CHAIRSIDE_DATA_DIR`: Directory for audit records (default: "chairside_data")
/// - `OPENAI_API_KEY`: Enables the OpenAI client; without it drafts come from an offline model
/// - `OPENAI_BASE_URL`, `OPENAI_MODEL`: Endpoint and model for generation
/// - `STORE_FULL_AUDIT_DATA`, `REDACT_PHI_FIELDS`, `PHI_FIELDS`: Audit payload redaction
/// - `TREATMENT_SUMMARY_SEED`, `INSURANCE_SUMMARY_SEED`: Initial seeds
/// - `HISTORY_MAX_DEPTH`: Bound on regeneration history walks
/// - `API_KEY`: When set, document endpoints require a matching `x-api-key` header
///
/// # Errors
/// Returns an error if configuration is invalid, the data directory cannot be created or the
/// server cannot bind its address.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chairside=info".parse()?)
                .add_directive("chairside_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = env("CHAIRSIDE_REST_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into());

    let cfg = Arc::new(core_config_from_env()?);
    let store = Arc::new(FileStore::open(cfg.data_dir())?);
    let cdt = Arc::new(CdtTable::embedded()?);

    let llm: Arc<dyn LlmClient> = match env("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
        Some(key) => Arc::new(OpenAiClient::new(key, env("OPENAI_BASE_URL"))),
        None => {
            tracing::warn!("OPENAI_API_KEY not set, generating offline drafts");
            Arc::new(ScriptedLlm::new())
        }
    };

    let state = AppState {
        documents: DocumentService::new(cfg.clone(), store.clone(), llm, cdt),
        confirmations: ConfirmationEvaluator::new(cfg.clone(), store),
        api_key: env("API_KEY").filter(|k| !k.is_empty()),
    };

    tracing::info!(
        "++ Starting chairside REST on {} (data dir {})",
        rest_addr,
        cfg.data_dir().display()
    );

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, api_rest::router(state)).await?;

    Ok(())
}
