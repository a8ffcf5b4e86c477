//! Generative Provider Abstraction
//!
//! Adapters around external text-generation providers. A client makes exactly
//! one external call per `complete` invocation and surfaces typed failures;
//! retry policy belongs to the caller (see `generator`).

use crate::error::{CompletionError, PipelineError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Completion client trait
///
/// `complete` maps one prompt to one completion. Rate limiting is the only
/// failure classified as transient; everything else is a `Provider` error,
/// including malformed responses and network faults.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for a fully rendered prompt
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;

    /// Get the provider name
    fn provider_name(&self) -> &str;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Provider kind selector for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Gemini,
    #[serde(rename = "openai_compatible")]
    OpenAiCompatible,
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_kind")]
    pub kind: ProviderKind,

    #[serde(default = "default_model")]
    pub model: String,

    /// API key literal; `api_key_env` is consulted when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Environment variable to read the API key from
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Endpoint override. Required for `openai_compatible`
    /// (e.g. http://localhost:11434/v1); optional for `gemini`.
    #[serde(default)]
    pub endpoint: Option<String>,
}

fn default_provider_kind() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            model: default_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            endpoint: None,
        }
    }
}

impl ProviderConfig {
    /// Resolve the API key from the config literal or the named env var.
    fn resolve_api_key(&self) -> Result<String, PipelineError> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env).map_err(|_| {
            PipelineError::Config(format!(
                "No API key: set provider.api_key or export {}",
                self.api_key_env
            ))
        })
    }
}

// Map transport-level errors to CompletionError. Status classification for
// non-2xx bodies happens at the response site, where the body text is known.
fn map_http_error(error: reqwest::Error) -> CompletionError {
    if error.is_status() && error.status().map(|s| s.as_u16()) == Some(429) {
        CompletionError::RateLimited(format!("Rate limit exceeded: {}", error))
    } else if error.is_timeout() {
        CompletionError::Provider(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        CompletionError::Provider(format!("Connection error: {}", error))
    } else {
        CompletionError::Provider(format!("HTTP error: {}", error))
    }
}

fn classify_status(status: reqwest::StatusCode, body: String) -> CompletionError {
    if status.as_u16() == 429 {
        CompletionError::RateLimited(format!("Rate limit exceeded: {}", body))
    } else {
        CompletionError::Provider(format!("Request failed with status {}: {}", status, body))
    }
}

const PROVIDER_HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROVIDER_HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn build_provider_http_client() -> Result<Client, PipelineError> {
    Client::builder()
        .no_proxy()
        .connect_timeout(PROVIDER_HTTP_CONNECT_TIMEOUT)
        .timeout(PROVIDER_HTTP_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| PipelineError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Gemini provider client (Google Generative Language API)
pub struct GeminiClient {
    client: Client,
    model: String,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(
        model: String,
        api_key: String,
        base_url: Option<String>,
    ) -> Result<Self, PipelineError> {
        let client = build_provider_http_client()?;
        let base_url = base_url
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string());

        Ok(Self {
            client,
            model,
            api_key,
            base_url,
        })
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, error_text));
        }

        let completion: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Provider(format!("Failed to parse response: {}", e)))?;

        let candidate = completion
            .candidates
            .first()
            .ok_or_else(|| CompletionError::Provider("No candidates in response".to_string()))?;

        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(CompletionError::Provider(
                "Empty completion text".to_string(),
            ));
        }

        Ok(text)
    }

    fn provider_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// OpenAI-compatible API request/response structures
#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatRequestMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatRequestMessage,
}

/// OpenAI-compatible provider client (local servers, Ollama, custom endpoints)
pub struct OpenAiCompatClient {
    client: Client,
    model: String,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiCompatClient {
    pub fn new(
        model: String,
        endpoint: String,
        api_key: Option<String>,
    ) -> Result<Self, PipelineError> {
        let client = build_provider_http_client()?;
        Ok(Self {
            client,
            model,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompatClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatRequestMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            stream: false,
        };

        let url = format!("{}/chat/completions", self.endpoint);
        let mut request_builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(api_key) = &self.api_key {
            request_builder =
                request_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request_builder
            .json(&request)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, error_text));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Provider(format!("Failed to parse response: {}", e)))?;

        let choice = completion
            .choices
            .first()
            .ok_or_else(|| CompletionError::Provider("No choices in response".to_string()))?;

        Ok(choice.message.content.clone())
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Provider factory for creating completion clients
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_client(
        config: &ProviderConfig,
    ) -> Result<Box<dyn CompletionClient>, PipelineError> {
        match config.kind {
            ProviderKind::Gemini => {
                let api_key = config.resolve_api_key()?;
                Ok(Box::new(GeminiClient::new(
                    config.model.clone(),
                    api_key,
                    config.endpoint.clone(),
                )?))
            }
            ProviderKind::OpenAiCompatible => {
                let endpoint = config.endpoint.clone().ok_or_else(|| {
                    PipelineError::Config(
                        "provider.endpoint is required for openai_compatible".to_string(),
                    )
                })?;
                // Key optional for local endpoints
                let api_key = config
                    .api_key
                    .clone()
                    .or_else(|| std::env::var(&config.api_key_env).ok());
                Ok(Box::new(OpenAiCompatClient::new(
                    config.model.clone(),
                    endpoint,
                    api_key,
                )?))
            }
        }
    }
}

// Mock client for testing: replays a scripted sequence of outcomes and counts
// attempts. The last script entry repeats once the script is exhausted.
#[cfg(test)]
pub struct MockCompletionClient {
    script: Vec<Result<String, MockFailure>>,
    calls: std::sync::Mutex<usize>,
}

#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    RateLimited,
    Provider,
}

#[cfg(test)]
impl MockCompletionClient {
    pub fn new(script: Vec<Result<String, MockFailure>>) -> Self {
        Self {
            script,
            calls: std::sync::Mutex::new(0),
        }
    }

    pub fn always_ok(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn always_rate_limited() -> Self {
        Self::new(vec![Err(MockFailure::RateLimited)])
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[cfg(test)]
#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        let mut calls = self.calls.lock().unwrap();
        let idx = (*calls).min(self.script.len().saturating_sub(1));
        *calls += 1;
        match &self.script[idx] {
            Ok(text) => Ok(text.clone()),
            Err(MockFailure::RateLimited) => {
                Err(CompletionError::RateLimited("429: quota exceeded".to_string()))
            }
            Err(MockFailure::Provider) => {
                Err(CompletionError::Provider("upstream fault".to_string()))
            }
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
