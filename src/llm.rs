use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use thiserror::Error;

use crate::models::{ModelInfo, Provider};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{0} is disabled: no API key configured")]
    Disabled(Provider),

    #[error("{0} request failed: {1}")]
    Http(Provider, #[source] reqwest::Error),

    #[error("{provider} API returned {status}: {body}")]
    Status {
        provider: Provider,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("{0} returned an empty response")]
    EmptyResponse(Provider),

    #[error("{0} returned non-text content: {1}")]
    NonText(Provider, String),

    #[error("unexpected {0} API response format")]
    Format(Provider),
}

impl LlmError {
    /// Request URLs are dropped so they never reach the logs
    fn http(provider: Provider, e: reqwest::Error) -> Self {
        LlmError::Http(provider, e.without_url())
    }
}

/// A single system + user exchange
#[derive(Debug, Clone)]
pub struct Completion {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// One vendor's text generation endpoint
#[async_trait]
pub trait Generator: Send + Sync {
    /// `model` is the vendor-specific model string
    async fn generate(&self, model: &str, completion: &Completion) -> Result<String, LlmError>;
}

/// API keys read from the environment at startup
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    keys: HashMap<Provider, String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        let mut keys = HashMap::new();
        for provider in Provider::ALL {
            let key = provider
                .env_vars()
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|v| !v.trim().is_empty());
            if let Some(key) = key {
                keys.insert(provider, key);
            }
        }
        Self { keys }
    }

    pub fn with(mut self, provider: Provider, key: impl Into<String>) -> Self {
        self.keys.insert(provider, key.into());
        self
    }

    pub fn get(&self, provider: Provider) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }
}

/// Routes a model to the generator of its provider
#[derive(Clone, Default)]
pub struct Dispatcher {
    generators: HashMap<Provider, Arc<dyn Generator>>,
}

impl Dispatcher {
    /// Build HTTP generators for every provider that has a key
    pub fn from_keys(client: &reqwest::Client, keys: &ApiKeys) -> Self {
        let mut dispatcher = Self::default();
        for provider in Provider::ALL {
            let Some(key) = keys.get(provider) else {
                warn!(
                    "{provider} disabled: set {} to enable it",
                    provider.env_vars().join(" or ")
                );
                continue;
            };
            let generator: Arc<dyn Generator> = match provider {
                Provider::OpenAi => Arc::new(OpenAiGenerator::new(client.clone(), key)),
                Provider::Gemini => Arc::new(GeminiGenerator::new(client.clone(), key)),
                Provider::Anthropic => Arc::new(AnthropicGenerator::new(client.clone(), key)),
            };
            dispatcher.generators.insert(provider, generator);
        }
        dispatcher
    }

    pub fn with(mut self, provider: Provider, generator: Arc<dyn Generator>) -> Self {
        self.generators.insert(provider, generator);
        self
    }

    pub fn is_enabled(&self, provider: Provider) -> bool {
        self.generators.contains_key(&provider)
    }

    pub async fn generate(&self, model: &ModelInfo, completion: &Completion) -> Result<String, LlmError> {
        let generator = self
            .generators
            .get(&model.provider)
            .ok_or(LlmError::Disabled(model.provider))?;
        debug!("Dispatching to {} with model {}", model.provider, model.vendor_model);
        generator.generate(model.vendor_model, completion).await
    }
}

async fn post_json(
    provider: Provider,
    request: reqwest::RequestBuilder,
    body: &serde_json::Value,
) -> Result<serde_json::Value, LlmError> {
    let resp = request
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::http(provider, e))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(LlmError::Status { provider, status, body });
    }

    resp.json().await.map_err(|e| LlmError::http(provider, e))
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
}

impl OpenAiGenerator {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    async fn generate(&self, model: &str, completion: &Completion) -> Result<String, LlmError> {
        debug!("OpenAI request with model {model}");

        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": completion.system },
                { "role": "user", "content": completion.user }
            ],
            "max_tokens": completion.max_tokens,
            "temperature": completion.temperature,
        });

        let request = self.client.post(OPENAI_URL).bearer_auth(&self.api_key);
        let json = post_json(Provider::OpenAi, request, &body).await?;
        extract_openai_text(&json)
    }
}

fn extract_openai_text(json: &serde_json::Value) -> Result<String, LlmError> {
    let message = json
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or(LlmError::Format(Provider::OpenAi))?;

    match message.get("content").and_then(|t| t.as_str()) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(LlmError::EmptyResponse(Provider::OpenAi)),
    }
}

pub struct AnthropicGenerator {
    client: reqwest::Client,
    api_key: String,
}

impl AnthropicGenerator {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl Generator for AnthropicGenerator {
    async fn generate(&self, model: &str, completion: &Completion) -> Result<String, LlmError> {
        debug!("Anthropic request with model {model}");

        let body = serde_json::json!({
            "model": model,
            "max_tokens": completion.max_tokens,
            "temperature": completion.temperature,
            "system": completion.system,
            "messages": [
                { "role": "user", "content": completion.user }
            ]
        });

        let request = self
            .client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let json = post_json(Provider::Anthropic, request, &body).await?;
        extract_anthropic_text(&json)
    }
}

/// Only the first content block counts, and it must be text
fn extract_anthropic_text(json: &serde_json::Value) -> Result<String, LlmError> {
    let first = json
        .get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| blocks.first())
        .ok_or(LlmError::EmptyResponse(Provider::Anthropic))?;

    let kind = first.get("type").and_then(|t| t.as_str()).unwrap_or_default();
    if kind != "text" {
        return Err(LlmError::NonText(Provider::Anthropic, kind.to_string()));
    }

    match first.get("text").and_then(|t| t.as_str()) {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        _ => Err(LlmError::EmptyResponse(Provider::Anthropic)),
    }
}

pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiGenerator {
    pub fn new(client: reqwest::Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: GEMINI_URL.to_string(),
        }
    }

    /// Point at a different `models` base, e.g. a proxy
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, model: &str, completion: &Completion) -> Result<String, LlmError> {
        debug!("Gemini request with model {model}");

        // generateContent takes a single prompt; the system text leads it
        let prompt = format!("{}\n\n{}", completion.system, completion.user);
        let body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "maxOutputTokens": completion.max_tokens,
                "temperature": completion.temperature,
            }
        });

        let url = format!("{}/{model}:generateContent", self.base_url);
        let request = self.client.post(&url).header("x-goog-api-key", &self.api_key);
        let json = post_json(Provider::Gemini, request, &body).await?;
        extract_gemini_text(&json)
    }
}

fn extract_gemini_text(json: &serde_json::Value) -> Result<String, LlmError> {
    let parts = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
        .ok_or(LlmError::EmptyResponse(Provider::Gemini))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text")?.as_str())
        .collect::<Vec<_>>()
        .join("");

    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse(Provider::Gemini));
    }
    Ok(text)
}


#[cfg(test)]
mod tests {
    use super::testing::MockGenerator;
    use super::*;
    use crate::models::lookup;

    fn completion() -> Completion {
        Completion {
            system: "sys".to_string(),
            user: "hello".to_string(),
            max_tokens: 100,
            temperature: 0.5,
        }
    }

    #[test]
    fn test_extract_openai_text() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "Summary of the video." } }
            ]
        });
        assert_eq!(extract_openai_text(&json).unwrap(), "Summary of the video.");
    }

    #[test]
    fn test_extract_openai_text_empty() {
        let json = serde_json::json!({"choices": []});
        assert!(matches!(extract_openai_text(&json), Err(LlmError::Format(_))));

        let json = serde_json::json!({"choices": [{"message": {"content": "  "}}]});
        assert!(matches!(extract_openai_text(&json), Err(LlmError::EmptyResponse(_))));
    }

    #[test]
    fn test_extract_anthropic_first_block_only() {
        let json = serde_json::json!({
            "content": [
                { "type": "text", "text": "Here is the summary." },
                { "type": "text", "text": "Ignored." }
            ]
        });
        assert_eq!(extract_anthropic_text(&json).unwrap(), "Here is the summary.");
    }

    #[test]
    fn test_extract_anthropic_non_text() {
        let json = serde_json::json!({
            "content": [ { "type": "tool_use", "id": "x" } ]
        });
        assert!(matches!(
            extract_anthropic_text(&json),
            Err(LlmError::NonText(Provider::Anthropic, kind)) if kind == "tool_use"
        ));
    }

    #[test]
    fn test_extract_anthropic_empty() {
        let json = serde_json::json!({"content": []});
        assert!(matches!(extract_anthropic_text(&json), Err(LlmError::EmptyResponse(_))));
    }

    #[test]
    fn test_extract_gemini_text() {
        let json = serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "こんにちは" }, { "text": "世界" } ] } }
            ]
        });
        assert_eq!(extract_gemini_text(&json).unwrap(), "こんにちは世界");

        let json = serde_json::json!({"candidates": []});
        assert!(extract_gemini_text(&json).is_err());
    }

    #[test]
    fn test_api_keys_with() {
        let keys = ApiKeys::default().with(Provider::Gemini, "g-key");
        assert_eq!(keys.get(Provider::Gemini), Some("g-key"));
        assert_eq!(keys.get(Provider::OpenAi), None);
    }

    #[test]
    fn test_from_keys_disables_missing_providers() {
        let keys = ApiKeys::default().with(Provider::OpenAi, "sk-test");
        let dispatcher = Dispatcher::from_keys(&reqwest::Client::new(), &keys);
        assert!(dispatcher.is_enabled(Provider::OpenAi));
        assert!(!dispatcher.is_enabled(Provider::Gemini));
        assert!(!dispatcher.is_enabled(Provider::Anthropic));
    }

    #[tokio::test]
    async fn test_dispatch_uses_vendor_model_string() {
        let openai = MockGenerator::replying(vec![Ok("a")]);
        let anthropic = MockGenerator::replying(vec![Ok("b")]);
        let dispatcher = Dispatcher::default()
            .with(Provider::OpenAi, openai.clone())
            .with(Provider::Anthropic, anthropic.clone());

        let out = dispatcher
            .generate(lookup("claude-3-5-sonnet").unwrap(), &completion())
            .await
            .unwrap();
        assert_eq!(out, "b");
        assert_eq!(anthropic.models_called(), vec!["claude-3-5-sonnet-20241022"]);
        assert_eq!(openai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_to_disabled_provider() {
        let dispatcher = Dispatcher::default();
        let err = dispatcher
            .generate(lookup("gemini-1.5-pro").unwrap(), &completion())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Disabled(Provider::Gemini)));
    }

    #[tokio::test]
    async fn test_gemini_sends_key_as_header() {
        use axum::{Json, Router, extract::Query, http::HeaderMap, routing::post};

        let router = Router::new().route(
            "/{*path}",
            post(|headers: HeaderMap, Query(q): Query<HashMap<String, String>>| async move {
                let key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok()).unwrap_or("");
                let text = format!("header={key} query={}", q.contains_key("key"));
                Json(serde_json::json!({
                    "candidates": [ { "content": { "parts": [ { "text": text } ] } } ]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let gemini = GeminiGenerator::new(reqwest::Client::new(), "g-secret").with_base_url(format!("http://{addr}/models"));
        let out = gemini.generate("gemini-1.5-pro-latest", &completion()).await.unwrap();
        assert_eq!(out, "header=g-secret query=false");
    }

    #[tokio::test]
    async fn test_transport_error_hides_key() {
        // bind then drop so the port refuses connections
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();

        let gemini = GeminiGenerator::new(reqwest::Client::new(), "SECRET-KEY-123").with_base_url(format!("http://{addr}/models"));
        let err = gemini.generate("gemini-1.5-pro-latest", &completion()).await.unwrap_err();

        assert!(matches!(err, LlmError::Http(Provider::Gemini, _)), "got {err:?}");
        let shown = err.to_string();
        assert!(!shown.contains("SECRET-KEY-123"), "{shown}");
        assert!(!shown.contains("http://"), "{shown}");
        assert!(!format!("{err:?}").contains("SECRET-KEY-123"));
    }
}
