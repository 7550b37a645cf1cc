//! Low-level pixel helpers shared by the pipeline stages.

use image::{imageops, imageops::FilterType, GrayImage, Luma, Rgba, RgbaImage};

/// Composite `color` at coverage `alpha` (0..=1) over `dst` (straight alpha).
pub(crate) fn blend_over(dst: &mut Rgba<u8>, color: [u8; 3], alpha: f32) {
    let src_a = alpha.clamp(0.0, 1.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }
    for c in 0..3 {
        let value = (color[c] as f32 * src_a + dst[c] as f32 * dst_a * (1.0 - src_a)) / out_a;
        dst[c] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Grow a coverage mask by `radius` pixels with an anti-aliased disc.
pub(crate) fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
    if radius == 0 {
        return mask.clone();
    }
    let (width, height) = mask.dimensions();
    let r = radius as i32;
    let reach = radius as f32 + 0.5;

    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx == 0 && dy == 0 {
                continue;
            }
            let weight = (reach - ((dx * dx + dy * dy) as f32).sqrt()).clamp(0.0, 1.0);
            if weight > 0.0 {
                offsets.push((dx, dy, weight));
            }
        }
    }

    let Some((x0, y0, x1, y1)) = coverage_bounds(mask) else {
        return GrayImage::new(width, height);
    };
    let x_start = x0.saturating_sub(radius);
    let y_start = y0.saturating_sub(radius);
    let x_end = (x1 + radius + 1).min(width);
    let y_end = (y1 + radius + 1).min(height);

    let mut out = GrayImage::new(width, height);
    for y in y_start..y_end {
        for x in x_start..x_end {
            let own = mask.get_pixel(x, y)[0];
            if own == 255 {
                out.put_pixel(x, y, Luma([255]));
                continue;
            }
            let mut best = own as f32;
            for &(dx, dy, weight) in &offsets {
                let sx = x as i32 + dx;
                let sy = y as i32 + dy;
                if sx < 0 || sy < 0 || sx >= width as i32 || sy >= height as i32 {
                    continue;
                }
                let value = mask.get_pixel(sx as u32, sy as u32)[0] as f32 * weight;
                if value > best {
                    best = value;
                    if best >= 255.0 {
                        break;
                    }
                }
            }
            out.put_pixel(x, y, Luma([best.round() as u8]));
        }
    }
    out
}

/// Inclusive bounding box of non-zero mask pixels.
fn coverage_bounds(mask: &GrayImage) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, px) in mask.enumerate_pixels() {
        if px[0] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds
}

/// Surround a mask with `pad` empty pixels on every side.
pub(crate) fn pad(mask: &GrayImage, pad: u32) -> GrayImage {
    let mut out = GrayImage::new(mask.width() + 2 * pad, mask.height() + 2 * pad);
    imageops::replace(&mut out, mask, pad as i64, pad as i64);
    out
}

/// Extract the alpha channel as a mask.
pub(crate) fn alpha_mask(img: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| Luma([img.get_pixel(x, y)[3]]))
}

/// Resize with premultiplied alpha so transparent pixels don't bleed dark fringes.
pub(crate) fn resize_rgba(img: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if img.width() == width && img.height() == height {
        return img.clone();
    }
    let mut premultiplied = img.clone();
    for px in premultiplied.pixels_mut() {
        let a = px[3] as u32;
        for c in 0..3 {
            px[c] = ((px[c] as u32 * a + 127) / 255) as u8;
        }
    }

    let mut out = imageops::resize(&premultiplied, width, height, FilterType::Lanczos3);
    for px in out.pixels_mut() {
        let a = px[3] as u32;
        if a == 0 {
            px.0 = [0, 0, 0, 0];
            continue;
        }
        for c in 0..3 {
            px[c] = ((px[c] as u32 * 255 + a / 2) / a).min(255) as u8;
        }
    }
    out
}
