//! Outline stroke around the cut-out subject.

use image::{Rgba, RgbaImage};

use super::config::RgbColor;
use super::raster::{alpha_mask, blend_over, dilate};

/// Draw a `width`-pixel outline of `color` around every visible pixel.
///
/// The outline is the subject's alpha mask grown by `width`, composited
/// beneath the subject so the subject itself is unchanged.
pub fn apply_stroke(canvas: &RgbaImage, width: u32, color: RgbColor) -> RgbaImage {
    if width == 0 {
        return canvas.clone();
    }
    let outline = dilate(&alpha_mask(canvas), width);

    let mut out = RgbaImage::new(canvas.width(), canvas.height());
    for (x, y, px) in out.enumerate_pixels_mut() {
        let [r, g, b] = color.0;
        *px = Rgba([r, g, b, outline.get_pixel(x, y)[0]]);
        if px[3] == 0 {
            *px = Rgba([0, 0, 0, 0]);
        }
        let subject = canvas.get_pixel(x, y);
        blend_over(px, [subject[0], subject[1], subject[2]], subject[3] as f32 / 255.0);
    }
    out
}
