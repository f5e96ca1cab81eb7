//! Language model collaborator.
//!
//! [`LlmClient`] is the only seam to the model. Requests carry the seed so a client that honours
//! it gives the same output for the same prompt and seed.
//!
//! - [`OpenAiClient`]: chat-completions API with JSON-schema structured output.
//! - [`ScriptedLlm`]: deterministic offline stand-in keyed by seed.

use crate::{AuditError, AuditResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// One structured-output completion request.
#[derive(Clone, Debug, PartialEq)]
pub struct LlmRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub seed: i64,
    /// Name and JSON schema of the expected output object.
    pub schema_name: &'static str,
    pub schema: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LlmResponse {
    pub content: Map<String, Value>,
    pub tokens_used: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &LlmRequest) -> AuditResult<LlmResponse>;
}

/// Client for OpenAI-compatible chat-completions endpoints.
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    refusal: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u32,
}

impl OpenAiClient {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    /// `base_url` should be like `https://api.openai.com/v1` (no trailing slash needed).
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn body(request: &LlmRequest) -> Value {
        json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt},
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "seed": request.seed,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": request.schema_name,
                    "schema": request.schema,
                    "strict": true,
                },
            },
        })
    }

    fn parse_response(response: ChatResponse) -> AuditResult<LlmResponse> {
        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AuditError::Llm("response contained no choices".into()))?;
        if let Some(refusal) = message.refusal {
            return Err(AuditError::Llm(format!("model refused: {}", refusal)));
        }
        let content = message
            .content
            .ok_or_else(|| AuditError::Llm("response contained no content".into()))?;
        let content = match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(AuditError::Llm("structured output was not an object".into())),
            Err(e) => return Err(AuditError::Llm(format!("structured output was not JSON: {}", e))),
        };

        Ok(LlmResponse {
            content,
            tokens_used: response.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &LlmRequest) -> AuditResult<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!(model = %request.model, seed = request.seed, "requesting completion");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| AuditError::Llm(format!("HTTP request failed: {}", e)))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuditError::Llm(format!(
                "server returned {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AuditError::Llm(format!("invalid response body: {}", e)))?;
        Self::parse_response(parsed)
    }
}

/// Offline model that fills every string field of the output schema with seed-stamped text.
///
/// The same request always yields the same output, and different seeds yield different text.
/// Every request is kept so tests can inspect what was sent.
#[derive(Default)]
pub struct ScriptedLlm {
    failure: Option<String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().clone()
    }

    fn draft(request: &LlmRequest) -> Map<String, Value> {
        let mut content = Map::new();
        let properties = request
            .schema
            .get("properties")
            .and_then(Value::as_object);
        for (name, property) in properties.into_iter().flatten() {
            if property.get("type").and_then(Value::as_str) == Some("string") {
                content.insert(
                    name.clone(),
                    Value::String(format!("Draft {} (seed {}).", name.replace('_', " "), request.seed)),
                );
            }
        }
        content
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: &LlmRequest) -> AuditResult<LlmResponse> {
        self.requests.lock().push(request.clone());
        if let Some(message) = &self.failure {
            return Err(AuditError::Llm(message.clone()));
        }
        Ok(LlmResponse {
            content: Self::draft(request),
            tokens_used: (request.user_prompt.len() / 4) as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(seed: i64) -> LlmRequest {
        LlmRequest {
            model: "gpt-4o".into(),
            system_prompt: "system".into(),
            user_prompt: "user prompt text".into(),
            temperature: 0.5,
            max_tokens: 1500,
            seed,
            schema_name: "insurance_summary",
            schema: json!({
                "type": "object",
                "properties": {
                    "insurance_summary": {"type": "string"},
                    "disclaimer": {"type": "string"},
                },
                "required": ["insurance_summary", "disclaimer"],
                "additionalProperties": false,
            }),
        }
    }

    #[tokio::test]
    async fn test_scripted_llm_is_deterministic_per_seed() {
        let llm = ScriptedLlm::new();
        let a = llm.complete(&request(42)).await.unwrap();
        let b = llm.complete(&request(42)).await.unwrap();
        let c = llm.complete(&request(43)).await.unwrap();

        assert_eq!(a, b);
        assert_ne!(a.content, c.content);
        assert_eq!(
            a.content["insurance_summary"],
            "Draft insurance summary (seed 42)."
        );
        assert_eq!(llm.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_failing_llm_records_request() {
        let llm = ScriptedLlm::failing("upstream timeout");
        let err = llm.complete(&request(42)).await.unwrap_err();
        assert!(matches!(err, AuditError::Llm(msg) if msg == "upstream timeout"));
        assert_eq!(llm.requests()[0].seed, 42);
    }

    #[test]
    fn test_openai_body_carries_seed_and_schema() {
        let body = OpenAiClient::body(&request(43));
        assert_eq!(body["seed"], 43);
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn test_parse_response_extracts_object_and_usage() {
        let raw: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "{\"insurance_summary\":\"ok\"}"}}],
            "usage": {"total_tokens": 77},
        }))
        .unwrap();
        let parsed = OpenAiClient::parse_response(raw).unwrap();
        assert_eq!(parsed.tokens_used, 77);
        assert_eq!(parsed.content["insurance_summary"], "ok");
    }

    #[test]
    fn test_parse_response_rejects_refusal_and_non_object() {
        let refusal: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": null, "refusal": "no"}}],
        }))
        .unwrap();
        assert!(OpenAiClient::parse_response(refusal).is_err());

        let array: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "[1]"}}],
        }))
        .unwrap();
        assert!(OpenAiClient::parse_response(array).is_err());
    }
}
