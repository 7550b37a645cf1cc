//! Image generator configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP image generation backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Base URL of an OpenAI-compatible images API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Requested image size, e.g. "1024x1024".
    #[serde(default = "default_size")]
    pub size: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-image-1".to_string()
}

fn default_size() -> String {
    "1024x1024".to_string()
}

fn default_timeout() -> u64 {
    120
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key: None,
            model: default_model(),
            size: default_size(),
            timeout_secs: default_timeout(),
        }
    }
}
