//! Generator trait and errors.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a single generation attempt.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Backend answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Backend did not answer in time.
    #[error("generation timed out after {0} seconds")]
    Timeout(u64),

    /// Response did not match the expected schema.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Response carried no image bytes.
    #[error("empty image payload")]
    EmptyPayload,

    /// Bytes are not an image the pipeline can decode.
    #[error("undecodable image payload: {0}")]
    UndecodablePayload(String),
}

impl GenerationError {
    /// Whether a `regenerate` is likely to help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) | Self::EmptyPayload => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse(_) | Self::UndecodablePayload(_) => false,
        }
    }
}

/// Turns a visual prompt into raw image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Implementation name, for logs.
    fn name(&self) -> &str;

    /// Generate one image. Stateless across calls.
    async fn generate(&self, visual_prompt: &str) -> Result<Vec<u8>, GenerationError>;
}

/// Rejects payloads that are empty or not in a format the `image` crate knows.
pub fn validate_payload(bytes: &[u8]) -> Result<(), GenerationError> {
    if bytes.is_empty() {
        return Err(GenerationError::EmptyPayload);
    }
    image::guess_format(bytes)
        .map(|_| ())
        .map_err(|e| GenerationError::UndecodablePayload(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_validate_payload() {
        assert!(validate_payload(&fixtures::raw_sticker_png(64)).is_ok());
        assert!(matches!(validate_payload(&[]), Err(GenerationError::EmptyPayload)));
        assert!(matches!(
            validate_payload(b"definitely not an image"),
            Err(GenerationError::UndecodablePayload(_))
        ));
    }

    #[test]
    fn test_retryable() {
        assert!(GenerationError::Timeout(5).is_retryable());
        assert!(GenerationError::Api { status: 503, message: String::new() }.is_retryable());
        assert!(!GenerationError::Api { status: 400, message: String::new() }.is_retryable());
        assert!(!GenerationError::InvalidResponse("x".to_string()).is_retryable());
    }
}
