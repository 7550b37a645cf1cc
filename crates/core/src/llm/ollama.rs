//! Ollama client for local inference.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::client::{post_json, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

const DEFAULT_API_BASE: &str = "http://localhost:11434";

/// Client for a local Ollama server's chat endpoint. No API key.
pub struct OllamaClient {
    client: reqwest::Client,
    model: String,
    api_base: String,
    timeout: Duration,
}

impl OllamaClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    /// JSON mode; local models otherwise drift into prose around the plan.
    format: &'static str,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    model: String,
    message: ChatReply,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: String,
}

fn build_request<'a>(model: &'a str, request: &'a CompletionRequest) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = request.system.as_deref() {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: &request.prompt,
    });

    ChatRequest {
        model,
        messages,
        stream: false,
        format: "json",
        options: ChatOptions {
            temperature: request.sampling_temperature(),
            num_predict: request.max_tokens,
        },
    }
}

/// `{"error": "model 'x' not found"}`
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value["error"].as_str().map(str::to_string)
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = build_request(&self.model, &request);
        let builder = self.client.post(format!("{}/api/chat", self.api_base));

        let response: ChatResponse = post_json(builder, &body, self.timeout, error_message).await?;
        Ok(CompletionResponse {
            text: response.message.content,
            usage: LlmUsage {
                input_tokens: response.prompt_eval_count,
                output_tokens: response.eval_count,
            },
            model: response.model,
        })
    }
}
