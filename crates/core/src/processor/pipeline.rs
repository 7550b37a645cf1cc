//! The raw-image-to-sticker pipeline.

use image::{imageops, RgbaImage};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::background::remove_background;
use super::caption::{overlay_caption, FontRasterizer};
use super::compress::compress_to_budget;
use super::config::ProcessorConfig;
use super::error::ProcessingError;
use super::raster::resize_rgba;
use super::stroke::apply_stroke;
use super::traits::{ProcessedSticker, StickerProcessor, TextRasterizer};
use crate::metrics;

/// Gap between the fitted subject and the canvas edge, beyond the stroke.
const EDGE_GAP: u32 = 2;

/// Deterministic [`StickerProcessor`] built on the `image` crate.
///
/// Stages, all at `working_size`:
/// 1. decode and fit the subject inside the canvas, leaving room for the stroke
/// 2. remove the border-connected backdrop
/// 3. outline the subject
/// 4. overlay the caption
///
/// The canvas is then downscaled and encoded for the sticker and thumbnail.
pub struct ImageProcessor {
    config: ProcessorConfig,
    rasterizer: Arc<dyn TextRasterizer>,
}

impl ImageProcessor {
    pub fn new(config: ProcessorConfig, rasterizer: Arc<dyn TextRasterizer>) -> Self {
        Self { config, rasterizer }
    }

    /// Build with the font named in `caption.font_path`.
    pub fn from_config(config: ProcessorConfig) -> Result<Self, ProcessingError> {
        let path = config
            .caption
            .font_path
            .clone()
            .ok_or_else(|| ProcessingError::Font("caption.font_path is not set".to_string()))?;
        let rasterizer = FontRasterizer::from_file(&path)?;
        debug!(font = %path.display(), "Loaded caption font");
        Ok(Self::new(config, Arc::new(rasterizer)))
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Run the compositing stages and return the full-size canvas.
    pub fn compose(&self, raw: &[u8], caption: &str) -> Result<RgbaImage, ProcessingError> {
        let decoded = image::load_from_memory(raw)
            .map_err(ProcessingError::from_decode)?
            .to_rgba8();
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(ProcessingError::Decode("image has no pixels".to_string()));
        }

        let working = self.config.working_size;
        let margin = self.config.stroke_width + EDGE_GAP;
        let inner = working.saturating_sub(2 * margin).max(1);

        let mut subject = fit_within(&decoded, inner);
        remove_background(
            &mut subject,
            self.config.background_inner_tolerance,
            self.config.background_outer_tolerance,
        );

        let mut canvas = RgbaImage::new(working, working);
        let x = (working - subject.width()) / 2;
        let y = (working - subject.height()) / 2;
        imageops::replace(&mut canvas, &subject, x as i64, y as i64);

        let mut canvas = apply_stroke(&canvas, self.config.stroke_width, self.config.stroke_color);
        overlay_caption(
            &mut canvas,
            caption,
            self.rasterizer.as_ref(),
            &self.config.caption,
        );
        Ok(canvas)
    }

    fn encode(&self, canvas: &RgbaImage) -> Result<ProcessedSticker, ProcessingError> {
        let config = &self.config;
        let sticker = compress_to_budget(
            canvas,
            config.sticker_size,
            config.min_dimension,
            config.min_quality_levels,
            config.max_bytes,
        )?;
        let thumbnail = compress_to_budget(
            canvas,
            config.thumbnail_size,
            config.thumbnail_size,
            config.min_quality_levels,
            config.max_bytes,
        )?;

        Ok(ProcessedSticker {
            image: sticker.bytes,
            thumbnail: thumbnail.bytes,
            dimension: sticker.dimension,
            quality_levels: sticker.levels,
        })
    }
}

impl StickerProcessor for ImageProcessor {
    fn name(&self) -> &str {
        "image"
    }

    fn process(&self, raw: &[u8], caption: &str) -> Result<ProcessedSticker, ProcessingError> {
        let start = Instant::now();
        let result = self.compose(raw, caption).and_then(|canvas| self.encode(&canvas));
        let elapsed = start.elapsed().as_secs_f64();

        match &result {
            Ok(sticker) => {
                metrics::PROCESSING_DURATION
                    .with_label_values(&["success"])
                    .observe(elapsed);
                debug!(
                    bytes = sticker.image.len(),
                    dimension = sticker.dimension,
                    levels = sticker.quality_levels,
                    elapsed_ms = (elapsed * 1000.0) as u64,
                    "Sticker processed"
                );
            }
            Err(e) => {
                metrics::PROCESSING_DURATION
                    .with_label_values(&["failed"])
                    .observe(elapsed);
                warn!("Sticker processing failed: {}", e);
            }
        }
        result
    }
}

/// Scale so the longer side equals `edge`, keeping the aspect ratio.
fn fit_within(img: &RgbaImage, edge: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let scale = edge as f32 / w.max(h) as f32;
    let width = ((w as f32 * scale).round() as u32).clamp(1, edge);
    let height = ((h as f32 * scale).round() as u32).clamp(1, edge);
    resize_rgba(img, width, height)
}
