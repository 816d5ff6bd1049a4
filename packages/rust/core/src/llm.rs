//! Chat-completion capability used by the summarizer and synthesizer.
//!
//! [`ChatModel`] is the seam the pipeline depends on. [`OpenRouterClient`]
//! implements it against any OpenAI-compatible `/chat/completions` endpoint
//! (OpenRouter by default) in JSON-object response mode.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use icebreaker_shared::{AppConfig, IcebreakerError, Result, read_api_key};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// One chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant".
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// A single completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    /// Ask the provider for a JSON object response.
    pub json_response: bool,
}

impl ChatRequest {
    /// System + user prompt pair expecting a JSON object back.
    pub fn json(
        model: impl Into<String>,
        temperature: f32,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: Some(temperature),
            json_response: true,
        }
    }

    /// Content of the last user message (empty if there is none).
    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// Completes a chat request and returns the assistant's raw message content.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenRouter / OpenAI-compatible client
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// HTTP client for an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenRouterClient {
    /// Create a client; `timeout` bounds every model call.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IcebreakerError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from the `[llm]` config section; the key comes from the env var it names.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = read_api_key(config)?;
        Self::new(
            api_key,
            &config.llm.base_url,
            Duration::from_secs(config.llm.request_timeout_secs),
        )
    }
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    #[instrument(skip_all, fields(model = %request.model))]
    async fn complete(&self, request: ChatRequest) -> Result<String> {
        let start = Instant::now();

        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request.json_response.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "model request failed");
                IcebreakerError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(%status, error = %error_text, "model API error");
            return Err(IcebreakerError::Model(format!("HTTP {status}: {error_text}")));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| IcebreakerError::parse(format!("invalid completion response: {e}")))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                tokens_in = usage.prompt_tokens,
                tokens_out = usage.completion_tokens,
                latency_ms = start.elapsed().as_millis() as u64,
                "model call complete"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| IcebreakerError::Model("completion returned no content".into()))
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Pull a non-blank string field out of a model's JSON reply.
///
/// Tolerates a Markdown code fence around the object, which some models add
/// even in JSON mode.
pub(crate) fn json_string_field(content: &str, field: &str) -> Option<String> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    let value: serde_json::Value = serde_json::from_str(unfenced.trim()).ok()?;
    let text = value.get(field)?.as_str()?.trim();

    (!text.is_empty()).then(|| text.to_string())
}
