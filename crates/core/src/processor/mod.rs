//! Turns a raw generated image into a platform-compliant sticker.
//!
//! The [`ImageProcessor`] removes the backdrop, outlines the subject, bakes
//! in the caption and encodes a sticker plus thumbnail under a byte budget.
//! Processing is CPU-bound and synchronous; async callers should run it on a
//! blocking thread.
//!
//! # Example
//!
//! ```ignore
//! use stickerpack_core::processor::{ImageProcessor, ProcessorConfig, StickerProcessor};
//!
//! let processor = ImageProcessor::from_config(ProcessorConfig::default())?;
//! let sticker = processor.process(&raw_png, "你好")?;
//! std::fs::write("01_greeting.png", &sticker.image)?;
//! ```

mod background;
mod caption;
mod compress;
mod config;
mod error;
mod pipeline;
mod raster;
mod stroke;
mod traits;

pub use background::remove_background;
pub use caption::{overlay_caption, FontRasterizer};
pub use compress::{compress_to_budget, encode_png, posterize, Encoded};
pub use config::{CaptionConfig, ProcessorConfig, RgbColor};
pub use error::ProcessingError;
pub use pipeline::ImageProcessor;
pub use stroke::apply_stroke;
pub use traits::{ProcessedSticker, StickerProcessor, TextRasterizer};
