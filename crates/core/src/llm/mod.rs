//! Language-model clients used by the planner.
//!
//! The [`LlmClient`] trait hides the provider; [`create_llm_client`] builds the
//! configured one. Responses are plain text; callers that expect JSON go
//! through [`extract_json`] so fenced or chatty replies still parse.

mod anthropic;
mod client;
mod config;
mod ollama;

pub use anthropic::AnthropicClient;
pub use client::{extract_json, CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};
pub use config::{LlmConfig, LlmProvider};
pub use ollama::OllamaClient;

use std::sync::Arc;
use std::time::Duration;

/// Either of the supported clients, so generic consumers can be built from config.
pub enum AnyLlmClient {
    Anthropic(Arc<AnthropicClient>),
    Ollama(Arc<OllamaClient>),
}

/// Build the client described by `config`.
pub fn create_llm_client(config: &LlmConfig) -> Result<AnyLlmClient, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs as u64);
    match config.provider {
        LlmProvider::Anthropic => {
            let api_key = config.api_key.clone().ok_or(LlmError::NotConfigured)?;
            let mut client = AnthropicClient::new(api_key, config.model.clone()).with_timeout(timeout);
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Ok(AnyLlmClient::Anthropic(Arc::new(client)))
        }
        LlmProvider::Ollama => {
            let mut client = OllamaClient::new(config.model.clone()).with_timeout(timeout);
            if let Some(ref api_base) = config.api_base {
                client = client.with_api_base(api_base.clone());
            }
            Ok(AnyLlmClient::Ollama(Arc::new(client)))
        }
    }
}
