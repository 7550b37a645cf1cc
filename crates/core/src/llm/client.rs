//! LLM client abstraction shared by every provider.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

/// Failure talking to a language model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Http(String),

    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unreadable provider reply: {0}")]
    Json(String),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("client is missing an API key")]
    NotConfigured,
}

impl LlmError {
    /// Maps a transport error, keeping timeouts distinguishable.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout)
        } else {
            LlmError::Http(err.to_string())
        }
    }
}

/// Tokens billed for one completion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// One single-turn completion: optional instructions plus a user message.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    /// `0.0` lets the provider use its own default.
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Temperature to send, or `None` to leave the provider default.
    pub(crate) fn sampling_temperature(&self) -> Option<f32> {
        (self.temperature > 0.0).then_some(self.temperature)
    }
}

/// Plain-text reply plus accounting.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub text: String,
    pub usage: LlmUsage,
    /// Model that actually answered, as reported by the provider.
    pub model: String,
}

/// A text-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Short provider label used in logs and metrics.
    fn provider(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

/// POST `body` as JSON and decode the JSON reply.
///
/// Non-success statuses become `LlmError::Api`, carrying the provider's own
/// error message when `error_message` can dig one out of the body.
pub(crate) async fn post_json<Req, Resp>(
    builder: reqwest::RequestBuilder,
    body: &Req,
    timeout: Duration,
    error_message: fn(&str) -> Option<String>,
) -> Result<Resp, LlmError>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let response = builder
        .timeout(timeout)
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::from_reqwest(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status: status.as_u16(),
            message: error_message(&text).unwrap_or(text),
        });
    }

    response.json().await.map_err(|e| LlmError::Json(e.to_string()))
}

/// Slices the outermost JSON object out of a model reply.
///
/// Models like to wrap JSON in markdown fences or add a sentence before it.
pub fn extract_json(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}
