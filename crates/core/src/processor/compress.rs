//! PNG encoding under a byte budget.
//!
//! The search walks a fixed ladder: fewer colour levels first, then smaller
//! dimensions. Every step is deterministic so the same canvas always lands on
//! the same bytes.

use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tracing::debug;

use super::error::ProcessingError;
use crate::metrics;
use super::raster::resize_rgba;

/// Colour levels tried per channel, best first.
pub(crate) const QUALITY_LADDER: [u16; 8] = [256, 128, 64, 32, 16, 8, 4, 2];

/// Each dimension step keeps this fraction of the previous edge.
const SHRINK_FACTOR: f32 = 0.9;

/// Result of a successful budget search.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub dimension: u32,
    pub levels: u16,
}

/// Encode an RGBA image as PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, ProcessingError> {
    let mut bytes = Vec::new();
    PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgba8)
        .map_err(|e| ProcessingError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Reduce every channel to `levels` evenly spaced values.
///
/// Fully transparent pixels are normalized to transparent black so hidden
/// colour noise doesn't cost bytes.
pub fn posterize(img: &RgbaImage, levels: u16) -> RgbaImage {
    let mut out = img.clone();
    let quantize = |v: u8| -> u8 {
        if levels >= 256 || levels < 2 {
            return v;
        }
        let steps = (levels - 1) as f32;
        ((v as f32 / 255.0 * steps).round() / steps * 255.0).round() as u8
    };
    for px in out.pixels_mut() {
        for c in 0..4 {
            px[c] = quantize(px[c]);
        }
        if px[3] == 0 {
            px.0 = [0, 0, 0, 0];
        }
    }
    out
}

/// Find the best encoding of `canvas` that fits in `budget` bytes.
///
/// Starts at `start_dim` with full colour and walks the quality ladder down
/// to `min_levels`. If nothing fits, the edge shrinks towards `min_dim` and
/// the ladder is walked again at each step. Fails with the smallest size seen
/// if nothing fits.
pub fn compress_to_budget(
    canvas: &RgbaImage,
    start_dim: u32,
    min_dim: u32,
    min_levels: u16,
    budget: usize,
) -> Result<Encoded, ProcessingError> {
    let start_dim = start_dim.max(1);
    let min_dim = min_dim.clamp(1, start_dim);
    let mut best_size = usize::MAX;
    let mut dimension = start_dim;

    loop {
        let resized = resize_rgba(canvas, dimension, dimension);
        for &levels in QUALITY_LADDER.iter().filter(|&&l| l >= min_levels) {
            let bytes = encode_png(&posterize(&resized, levels))?;
            best_size = best_size.min(bytes.len());
            if bytes.len() > budget {
                continue;
            }

            if levels < 256 {
                metrics::BUDGET_FALLBACKS.with_label_values(&["levels"]).inc();
            }
            if dimension < start_dim {
                metrics::BUDGET_FALLBACKS.with_label_values(&["dimension"]).inc();
            }
            if levels < 256 || dimension < start_dim {
                debug!(levels, dimension, size = bytes.len(), budget, "Fit budget with lossy fallback");
            }
            return Ok(Encoded {
                bytes,
                dimension,
                levels,
            });
        }

        if dimension <= min_dim {
            break;
        }
        dimension = ((dimension as f32 * SHRINK_FACTOR) as u32).clamp(min_dim, dimension - 1);
    }

    Err(ProcessingError::SizeBudgetExceeded { best_size, budget })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Per-pixel pseudo-random noise; compresses badly on purpose.
    fn noise(size: u32) -> RgbaImage {
        let mut state: u32 = 0x2545_f491;
        RgbaImage::from_fn(size, size, |_, _| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            Rgba([r, g, b, 255])
        })
    }

    #[test]
    fn test_posterize_levels() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([100, 200, 30, 255]));
        let two = posterize(&img, 2);
        assert_eq!(two.get_pixel(0, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(posterize(&img, 256), img);
    }

    #[test]
    fn test_posterize_clears_hidden_colour() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([90, 90, 90, 0]));
        assert_eq!(posterize(&img, 256).get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_simple_image_fits_losslessly() {
        let canvas = RgbaImage::from_pixel(64, 64, Rgba([255, 0, 0, 255]));
        let encoded = compress_to_budget(&canvas, 32, 32, 8, 10_000).unwrap();
        assert_eq!(encoded.levels, 256);
        assert_eq!(encoded.dimension, 32);

        let decoded = image::load_from_memory(&encoded.bytes).unwrap();
        assert_eq!(decoded.width(), 32);
    }

    #[test]
    fn test_noise_falls_back_to_fewer_levels() {
        let canvas = noise(64);
        let lossless = encode_png(&canvas).unwrap().len();
        let encoded = compress_to_budget(&canvas, 64, 64, 2, lossless / 2).unwrap();

        assert!(encoded.levels < 256);
        assert_eq!(encoded.dimension, 64);
        assert!(encoded.bytes.len() <= lossless / 2);
    }

    #[test]
    fn test_dimension_fallback() {
        let canvas = noise(64);
        let lossless = encode_png(&canvas).unwrap().len();
        let at_floor = encode_png(&posterize(&canvas, 128)).unwrap().len();
        let budget = lossless.min(at_floor) - 1;
        let encoded = compress_to_budget(&canvas, 64, 16, 128, budget).unwrap();

        assert!(encoded.dimension < 64);
        assert!(encoded.dimension >= 16);
    }

    #[test]
    fn test_impossible_budget() {
        let canvas = noise(32);
        let result = compress_to_budget(&canvas, 32, 32, 8, 10);
        match result {
            Err(ProcessingError::SizeBudgetExceeded { best_size, budget }) => {
                assert_eq!(budget, 10);
                assert!(best_size > 10);
            }
            other => panic!("expected SizeBudgetExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_deterministic() {
        let canvas = noise(48);
        let a = compress_to_budget(&canvas, 40, 20, 8, 3_000).map(|e| e.bytes);
        let b = compress_to_budget(&canvas, 40, 20, 8, 3_000).map(|e| e.bytes);
        assert_eq!(a.ok(), b.ok());
    }
}
