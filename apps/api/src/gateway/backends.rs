//! Provider wire adapters. Each backend owns one HTTP dialect and maps
//! provider responses onto `BackendFailure`; retry and fallback live in the
//! gateway, never here.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BackendFailure, CompletionRequest, ModelBackend};
use async_trait::async_trait;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Per-call timeout. A timed-out call is classified as a transport failure
/// and falls through to the next model.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(120);

/// Shared error envelope; Anthropic and OpenAI-compatible APIs both return
/// `{"error": {"type": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(rename = "type", default)]
    kind: String,
    message: String,
}

/// Maps a non-2xx response onto a failure class. `kind` is the provider's
/// error type string when the body was parsable, empty otherwise.
fn classify_status(status: u16, kind: &str, message: String) -> BackendFailure {
    match status {
        401 | 403 => BackendFailure::AuthInvalid,
        429 if kind == "insufficient_quota" => BackendFailure::QuotaExhausted,
        429 => BackendFailure::RateLimited,
        // Anthropic reports an empty balance as a 400 invalid_request_error.
        400 if message.to_lowercase().contains("credit balance") => {
            BackendFailure::QuotaExhausted
        }
        400 => BackendFailure::InvalidRequest(message),
        503 | 529 => BackendFailure::Overloaded,
        _ if kind == "overloaded_error" => BackendFailure::Overloaded,
        _ => BackendFailure::Server { status, message },
    }
}

/// Extracts (kind, message) from a provider error body, falling back to the
/// raw text when it is not the shared envelope.
fn error_parts(body: String) -> (String, String) {
    match serde_json::from_str::<ApiError>(&body) {
        Ok(parsed) => (parsed.error.kind, parsed.error.message),
        Err(_) => (String::new(), body),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Clone)]
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, BackendFailure> {
        let body = AnthropicRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            system: request.system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: request.user,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (kind, message) = error_parts(response.text().await.unwrap_or_default());
            return Err(classify_status(status.as_u16(), &kind, message));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| BackendFailure::Transport(e.to_string()))?;
        debug!(
            "Anthropic call succeeded: input_tokens={}, output_tokens={}",
            parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        match parsed.text() {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(BackendFailure::EmptyContent),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible chat completions
// ────────────────────────────────────────────────────────────────────────────

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Works against api.openai.com and any endpoint speaking the same dialect;
/// `base_url` selects the host.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, BackendFailure> {
        let body = ChatRequest {
            model: request.model,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system,
                },
                ChatMessage {
                    role: "user",
                    content: request.user,
                },
            ],
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (kind, message) = error_parts(response.text().await.unwrap_or_default());
            return Err(classify_status(status.as_u16(), &kind, message));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendFailure::Transport(e.to_string()))?;

        match parsed.choices.first().and_then(|c| c.message.content.as_deref()) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(BackendFailure::EmptyContent),
        }
    }
}
