//! OpenAI-compatible image generation client.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::config::GeneratorConfig;
use super::traits::{validate_payload, GenerationError, ImageGenerator};

/// Image generator speaking the `/v1/images/generations` protocol.
pub struct HttpImageGenerator {
    client: reqwest::Client,
    config: GeneratorConfig,
}

impl HttpImageGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn map_transport(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.config.timeout_secs)
        } else {
            GenerationError::Http(err.to_string())
        }
    }

    /// Pull the image bytes out of a parsed response.
    async fn extract_image(&self, response: ImagesResponse) -> Result<Vec<u8>, GenerationError> {
        let datum = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidResponse("no data entries".to_string()))?;

        match (datum.b64_json, datum.url) {
            (Some(b64), _) => STANDARD
                .decode(b64.trim())
                .map_err(|e| GenerationError::InvalidResponse(format!("bad base64: {}", e))),
            (None, Some(url)) => {
                debug!(%url, "Fetching generated image by URL");
                let response = self
                    .client
                    .get(&url)
                    .timeout(self.timeout())
                    .send()
                    .await
                    .map_err(|e| self.map_transport(e))?;
                let status = response.status().as_u16();
                if status != 200 {
                    return Err(GenerationError::Api {
                        status,
                        message: format!("image download failed: {}", url),
                    });
                }
                let bytes = response.bytes().await.map_err(|e| self.map_transport(e))?;
                Ok(bytes.to_vec())
            }
            (None, None) => Err(GenerationError::InvalidResponse(
                "entry has neither b64_json nor url".to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    b64_json: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, visual_prompt: &str) -> Result<Vec<u8>, GenerationError> {
        let request = ImagesRequest {
            model: &self.config.model,
            prompt: visual_prompt,
            n: 1,
            size: &self.config.size,
            response_format: "b64_json",
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/images/generations", self.config.api_base))
            .timeout(self.timeout())
            .json(&request);
        if let Some(ref api_key) = self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status().as_u16();

        if status != 200 {
            let error_text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(GenerationError::Api { status, message });
        }

        let parsed: ImagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let bytes = self.extract_image(parsed).await?;
        validate_payload(&bytes)?;

        debug!(bytes = bytes.len(), model = %self.config.model, "Image generated");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn generator() -> HttpImageGenerator {
        HttpImageGenerator::new(GeneratorConfig::default())
    }

    #[test]
    fn test_request_serialization() {
        let request = ImagesRequest {
            model: "gpt-image-1",
            prompt: "a cat",
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"prompt\":\"a cat\""));
        assert!(json.contains("\"response_format\":\"b64_json\""));
    }

    #[tokio::test]
    async fn test_extract_b64() {
        let png = fixtures::raw_sticker_png(32);
        let response: ImagesResponse = serde_json::from_value(serde_json::json!({
            "data": [{ "b64_json": STANDARD.encode(&png) }]
        }))
        .unwrap();
        let bytes = generator().extract_image(response).await.unwrap();
        assert_eq!(bytes, png);
    }

    #[tokio::test]
    async fn test_extract_empty_data() {
        let response: ImagesResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        let result = generator().extract_image(response).await;
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_extract_bad_base64() {
        let response: ImagesResponse =
            serde_json::from_str(r#"{"data": [{"b64_json": "!!not base64!!"}]}"#).unwrap();
        let result = generator().extract_image(response).await;
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_extract_entry_without_payload() {
        let response: ImagesResponse = serde_json::from_str(r#"{"data": [{}]}"#).unwrap();
        let result = generator().extract_image(response).await;
        assert!(matches!(result, Err(GenerationError::InvalidResponse(_))));
    }
}
