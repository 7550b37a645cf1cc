//! Caption overlay.

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::{GrayImage, Luma, RgbaImage};
use std::path::Path;
use tracing::debug;

use super::config::{CaptionConfig, RgbColor};
use super::error::ProcessingError;
use super::raster::{blend_over, dilate, pad};
use super::traits::TextRasterizer;

/// Captions never shrink below this many pixels per em.
const MIN_CAPTION_PX: f32 = 8.0;

/// Shrink-to-fit attempts before giving up and letting the caption clip.
const MAX_FIT_ATTEMPTS: usize = 4;

/// [`TextRasterizer`] backed by a TrueType/OpenType font.
pub struct FontRasterizer {
    font: FontVec,
}

impl FontRasterizer {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ProcessingError> {
        let font = FontVec::try_from_vec(bytes).map_err(|e| ProcessingError::Font(e.to_string()))?;
        Ok(Self { font })
    }

    pub fn from_file(path: &Path) -> Result<Self, ProcessingError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ProcessingError::Font(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(bytes)
    }
}

impl TextRasterizer for FontRasterizer {
    fn name(&self) -> &str {
        "font"
    }

    fn rasterize(&self, text: &str, px: f32) -> GrayImage {
        let scale = PxScale::from(px);
        let scaled = self.font.as_scaled(scale);
        let ascent = scaled.ascent();

        let mut caret = 0.0f32;
        let mut previous = None;
        let mut glyphs = Vec::new();
        for ch in text.chars() {
            let id = scaled.glyph_id(ch);
            if let Some(prev) = previous {
                caret += scaled.kern(prev, id);
            }
            glyphs.push(id.with_scale_and_position(scale, point(caret, ascent)));
            caret += scaled.h_advance(id);
            previous = Some(id);
        }

        let width = caret.ceil().max(1.0) as u32;
        let height = scaled.height().ceil().max(1.0) as u32;
        let mut mask = GrayImage::new(width, height);

        for glyph in glyphs {
            let Some(outlined) = self.font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let x = bounds.min.x as i32 + gx as i32;
                let y = bounds.min.y as i32 + gy as i32;
                if x < 0 || y < 0 || x >= width as i32 || y >= height as i32 {
                    return;
                }
                let value = (coverage * 255.0).round().clamp(0.0, 255.0) as u8;
                let px = mask.get_pixel_mut(x as u32, y as u32);
                px[0] = px[0].max(value);
            });
        }
        mask
    }
}

/// Draw `caption` bottom-centred on the canvas with an outline.
///
/// The font size starts at `size_ratio` of the canvas edge and shrinks until
/// the outlined caption fits within `max_width_ratio`. Blank captions are a
/// no-op.
pub fn overlay_caption(
    canvas: &mut RgbaImage,
    caption: &str,
    rasterizer: &dyn TextRasterizer,
    config: &CaptionConfig,
) {
    let text = caption.trim();
    if text.is_empty() {
        return;
    }

    let edge = canvas.width().min(canvas.height()) as f32;
    let outline = config.outline_width;
    let max_width = (edge * config.max_width_ratio - 2.0 * outline as f32).max(1.0);

    let mut px = (edge * config.size_ratio).max(MIN_CAPTION_PX);
    let mut glyphs = rasterizer.rasterize(text, px);
    for _ in 0..MAX_FIT_ATTEMPTS {
        if glyphs.width() as f32 <= max_width || px <= MIN_CAPTION_PX {
            break;
        }
        px = (px * max_width / glyphs.width() as f32).floor().max(MIN_CAPTION_PX);
        glyphs = rasterizer.rasterize(text, px);
    }
    if glyphs.width() == 0 || glyphs.height() == 0 {
        return;
    }
    debug!(caption = text, px, rasterizer = rasterizer.name(), "Placing caption");

    let fill = pad(&glyphs, outline);
    let halo = dilate(&fill, outline);

    let x0 = (canvas.width() as i64 - fill.width() as i64) / 2;
    let y0 = canvas.height() as i64
        - (edge * config.bottom_margin_ratio).round() as i64
        - fill.height() as i64;

    paint_mask(canvas, &halo, x0, y0, config.outline_color);
    paint_mask(canvas, &fill, x0, y0, config.fill_color);
}

/// Blend `color` onto the canvas through `mask`, clipping at the edges.
fn paint_mask(canvas: &mut RgbaImage, mask: &GrayImage, x0: i64, y0: i64, color: RgbColor) {
    for (mx, my, Luma([coverage])) in mask.enumerate_pixels() {
        if *coverage == 0 {
            continue;
        }
        let x = x0 + mx as i64;
        let y = y0 + my as i64;
        if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
            continue;
        }
        blend_over(
            canvas.get_pixel_mut(x as u32, y as u32),
            color.0,
            *coverage as f32 / 255.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::BlockRasterizer;
    use image::Rgba;

    fn column_is_clear(canvas: &RgbaImage, x: u32) -> bool {
        (0..canvas.height()).all(|y| canvas.get_pixel(x, y)[3] == 0)
    }

    #[test]
    fn test_caption_lands_bottom_centre() {
        let mut canvas = RgbaImage::new(200, 200);
        overlay_caption(&mut canvas, "你好", &BlockRasterizer, &CaptionConfig::default());

        assert!((0..100).all(|y| canvas.get_pixel(100, y)[3] == 0));
        assert!(column_is_clear(&canvas, 0));
        assert!(column_is_clear(&canvas, 199));

        let black = Rgba([0, 0, 0, 255]);
        let white = Rgba([255, 255, 255, 255]);
        let lower: Vec<_> = (100..200).map(|y| *canvas.get_pixel(85, y)).collect();
        assert!(lower.contains(&black));
        assert!(lower.contains(&white));
    }

    #[test]
    fn test_long_caption_shrinks_to_fit() {
        let mut canvas = RgbaImage::new(200, 200);
        overlay_caption(
            &mut canvas,
            "一二三四五六七八九十",
            &BlockRasterizer,
            &CaptionConfig::default(),
        );

        for x in 0..5 {
            assert!(column_is_clear(&canvas, x));
            assert!(column_is_clear(&canvas, 199 - x));
        }
        assert!(canvas.pixels().any(|p| p[3] == 255));
    }

    #[test]
    fn test_blank_caption_is_noop() {
        let mut canvas = RgbaImage::new(64, 64);
        overlay_caption(&mut canvas, "   ", &BlockRasterizer, &CaptionConfig::default());
        assert!(canvas.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_caption_colours() {
        let mut canvas = RgbaImage::new(200, 200);
        let config = CaptionConfig {
            fill_color: RgbColor([200, 0, 0]),
            outline_width: 0,
            ..Default::default()
        };
        overlay_caption(&mut canvas, "OK", &BlockRasterizer, &config);
        assert!(canvas.pixels().any(|p| *p == Rgba([200, 0, 0, 255])));
        assert!(!canvas.pixels().any(|p| *p == Rgba([255, 255, 255, 255])));
    }

    #[test]
    fn test_invalid_font_bytes() {
        let result = FontRasterizer::from_bytes(b"not a font".to_vec());
        assert!(matches!(result, Err(ProcessingError::Font(_))));
    }

    #[test]
    fn test_missing_font_file() {
        let result = FontRasterizer::from_file(Path::new("/nonexistent/font.ttf"));
        assert!(matches!(result, Err(ProcessingError::Font(msg)) if msg.contains("/nonexistent/font.ttf")));
    }
}
