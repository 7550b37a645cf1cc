//! Processor seams: the sticker processor itself and caption rasterization.

use image::GrayImage;

use super::error::ProcessingError;

/// A finished, platform-compliant sticker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedSticker {
    /// PNG at `dimension` x `dimension`.
    pub image: Vec<u8>,
    /// PNG at the configured thumbnail size.
    pub thumbnail: Vec<u8>,
    /// Edge length of `image`; the sticker size unless the budget forced a shrink.
    pub dimension: u32,
    /// Colour levels per channel the budget search settled on (256 = lossless).
    pub quality_levels: u16,
}

/// Turns a raw generated image plus caption into a finished sticker.
///
/// Implementations must be deterministic: the same `(raw, caption)` pair
/// always yields byte-identical output.
pub trait StickerProcessor: Send + Sync {
    /// Implementation name, for logs.
    fn name(&self) -> &str;

    /// Run the full pipeline. Never returns partial output.
    fn process(&self, raw: &[u8], caption: &str) -> Result<ProcessedSticker, ProcessingError>;
}

/// Rasterizes caption text into a coverage mask.
pub trait TextRasterizer: Send + Sync {
    /// Implementation name, for logs.
    fn name(&self) -> &str;

    /// Coverage mask (0 = empty, 255 = solid) for `text` set at `px` pixels
    /// per em. The mask is tight horizontally around the advance width and
    /// spans the full line height vertically.
    fn rasterize(&self, text: &str, px: f32) -> GrayImage;
}
