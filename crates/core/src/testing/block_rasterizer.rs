//! Font-free caption rasterizer.

use image::{GrayImage, Luma};

use crate::processor::TextRasterizer;

/// Draws every character as a solid block.
///
/// Each character advances by `px` and occupies the middle of a `1.2 * px`
/// line; whitespace is left blank. Output is binary (0 or 255).
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockRasterizer;

impl TextRasterizer for BlockRasterizer {
    fn name(&self) -> &str {
        "block"
    }

    fn rasterize(&self, text: &str, px: f32) -> GrayImage {
        let chars: Vec<char> = text.chars().collect();
        let advance = px.round().max(1.0) as u32;
        let line = (px * 1.2).round().max(1.0) as u32;
        let inset = advance / 8;
        let top = (line as f32 * 0.15) as u32;
        let bottom = (line as f32 * 0.85) as u32;

        GrayImage::from_fn(advance * chars.len() as u32, line, |x, y| {
            let ch = chars[(x / advance) as usize];
            let cx = x % advance;
            let inside = cx >= inset && cx < advance - inset && y >= top && y < bottom;
            if inside && !ch.is_whitespace() {
                Luma([255])
            } else {
                Luma([0])
            }
        })
    }
}
