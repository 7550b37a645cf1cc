//! Error types for the processor.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while turning a raw image into a sticker.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Raw bytes could not be decoded.
    #[error("failed to decode raw image: {0}")]
    Decode(String),

    /// Raw bytes are in a format the pipeline does not handle.
    #[error("unsupported raw image format: {0}")]
    UnsupportedFormat(String),

    /// Caption font could not be loaded.
    #[error("failed to load caption font: {0}")]
    Font(String),

    /// Encoding the output failed.
    #[error("failed to encode sticker: {0}")]
    Encode(String),

    /// Even the lowest allowed quality and dimension exceed the byte budget.
    #[error("size budget exceeded: smallest encoding was {best_size} bytes, budget is {budget}")]
    SizeBudgetExceeded { best_size: usize, budget: usize },

    /// Processing did not finish in time.
    #[error("processing timed out after {0:?}")]
    Timeout(Duration),
}

impl ProcessingError {
    /// Classifies an `image` decode error.
    pub fn from_decode(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Unsupported(e) => Self::UnsupportedFormat(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}
