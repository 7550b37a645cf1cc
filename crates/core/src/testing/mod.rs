//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of every backend seam, allowing
//! full pack runs without network access or font files.
//!
//! # Example
//!
//! ```rust,ignore
//! use stickerpack_core::testing::{MockGenerator, MockPlanner, MockProcessor};
//!
//! let planner = Arc::new(MockPlanner::new());
//! let generator = Arc::new(MockGenerator::new());
//! let processor = Arc::new(MockProcessor::new());
//!
//! // Configure failures
//! generator.fail_when_prompt_contains("waving hello");
//! processor.fail_on_caption("生气");
//!
//! // Wire into a PackOrchestrator...
//! ```

mod block_rasterizer;
mod mock_generator;
mod mock_llm;
mod mock_planner;
mod mock_processor;

pub use block_rasterizer::BlockRasterizer;
pub use mock_generator::MockGenerator;
pub use mock_llm::MockLlmClient;
pub use mock_planner::MockPlanner;
pub use mock_processor::MockProcessor;

/// Test fixtures and helper functions.
pub mod fixtures {
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;

    use crate::emotion::Emotion;
    use crate::orchestrator::{StickerRecord, StickerStatus};
    use crate::planner::StickerPlan;
    use crate::processor::{encode_png, ProcessedSticker};

    /// Backdrop colour of generated fixtures.
    pub const BACKDROP: Rgba<u8> = Rgba([255, 255, 255, 255]);

    /// Body colour of the fixture character.
    pub const BODY: Rgba<u8> = Rgba([235, 130, 40, 255]);

    /// Square raw image as a generator would return it.
    pub fn raw_sticker_png(size: u32) -> Vec<u8> {
        raw_sticker_png_sized(size, size)
    }

    /// An orange blob with two eyes on a white backdrop, PNG encoded.
    pub fn raw_sticker_png_sized(width: u32, height: u32) -> Vec<u8> {
        encode_png(&raw_sticker(width, height)).unwrap_or_default()
    }

    /// Unencoded version of [`raw_sticker_png_sized`].
    pub fn raw_sticker(width: u32, height: u32) -> RgbaImage {
        let unit = width.min(height) as f32;
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let body = unit * 0.35;
        let eye = unit * 0.04;
        let eyes = [
            (cx - unit * 0.12, cy - unit * 0.08),
            (cx + unit * 0.12, cy - unit * 0.08),
        ];

        RgbaImage::from_fn(width, height, |x, y| {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let in_eye = eyes
                .iter()
                .any(|(ex, ey)| (px - ex).hypot(py - ey) <= eye);
            if in_eye {
                Rgba([30, 20, 20, 255])
            } else if (px - cx).hypot(py - cy) <= body {
                BODY
            } else {
                BACKDROP
            }
        })
    }

    /// Per-pixel pseudo-random noise; defeats PNG compression.
    pub fn noisy_png(size: u32) -> Vec<u8> {
        let mut state: u32 = 0x9e37_79b9;
        let img = RgbaImage::from_fn(size, size, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 255])
        });
        encode_png(&img).unwrap_or_default()
    }

    /// A backend plan reply listing `emotions` in the given order, one per line.
    pub fn llm_plan_json(emotions: &[Emotion]) -> String {
        let entries: Vec<String> = emotions
            .iter()
            .enumerate()
            .map(|(idx, emotion)| {
                format!(
                    r#"    {{"id": {}, "emotion": "{}", "visual_prompt": "The character is {}", "caption": "{}"}}"#,
                    idx + 1,
                    emotion.key(),
                    emotion.intent(),
                    emotion.caption()
                )
            })
            .collect();
        format!("{{\n  \"stickers\": [\n{}\n  ]\n}}", entries.join(",\n"))
    }

    /// A plan with the canonical caption for `emotion`.
    pub fn plan(id: u32, emotion: Emotion) -> StickerPlan {
        StickerPlan {
            id,
            emotion,
            visual_prompt: format!("A test sticker, {}", emotion.intent()),
            caption: emotion.caption().to_string(),
        }
    }

    /// A tiny processed sticker whose pixels depend on `seed`.
    pub fn processed_sticker(seed: u8) -> ProcessedSticker {
        let image = RgbaImage::from_pixel(8, 8, Rgba([seed, 255 - seed, 128, 255]));
        let thumbnail = RgbaImage::from_pixel(4, 4, Rgba([seed, 255 - seed, 128, 255]));
        ProcessedSticker {
            image: encode_png(&image).unwrap_or_default(),
            thumbnail: encode_png(&thumbnail).unwrap_or_default(),
            dimension: 8,
            quality_levels: 256,
        }
    }

    /// A record in `status`; `Complete` records get a processed sticker.
    pub fn record_with_status(id: u32, emotion: Emotion, status: StickerStatus) -> StickerRecord {
        let mut record = StickerRecord::from_plan(plan(id, emotion));
        record.status = status;
        if matches!(status, StickerStatus::Processing | StickerStatus::Complete) {
            record.raw_image = Some(Arc::new(raw_sticker_png(32)));
        }
        if status == StickerStatus::Complete {
            record.processed = Some(Arc::new(processed_sticker(id as u8)));
        }
        if status == StickerStatus::Error {
            record.error = Some("mock failure".to_string());
        }
        record
    }

    /// A `Complete` record.
    pub fn complete_record(id: u32, emotion: Emotion) -> StickerRecord {
        record_with_status(id, emotion, StickerStatus::Complete)
    }
}
