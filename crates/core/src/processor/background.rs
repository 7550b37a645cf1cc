//! Background removal.
//!
//! Generated stickers sit on a plain, roughly uniform backdrop. The backdrop
//! colour is estimated from the image border, then a flood fill from the
//! border marks every connected pixel close to it. Enclosed regions of the
//! same colour (eyes, teeth) are not reachable and stay opaque.

use image::{Rgba, RgbaImage};
use std::collections::VecDeque;

/// Make the border-connected backdrop transparent.
///
/// Distances below `inner` become fully transparent, distances above `outer`
/// are left alone, and the band in between gets a linear alpha ramp with the
/// backdrop colour un-blended out of it so edges don't keep a halo.
pub fn remove_background(img: &mut RgbaImage, inner: f32, outer: f32) {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let Some(backdrop) = border_median(img) else {
        return;
    };

    let w = width as usize;
    let h = height as usize;
    let distance = |px: &Rgba<u8>| color_distance(px, backdrop);
    let reachable = |px: &Rgba<u8>| px[3] == 0 || distance(px) <= outer;

    let mut visited = vec![false; w * h];
    let mut queue = VecDeque::new();

    for (x, y) in border_coords(width, height) {
        let idx = y as usize * w + x as usize;
        if !visited[idx] && reachable(img.get_pixel(x, y)) {
            visited[idx] = true;
            queue.push_back(idx);
        }
    }

    while let Some(idx) = queue.pop_front() {
        let x = idx % w;
        let y = idx / w;
        let neighbours = [
            (x > 0).then(|| idx - 1),
            (x + 1 < w).then(|| idx + 1),
            (y > 0).then(|| idx - w),
            (y + 1 < h).then(|| idx + w),
        ];
        for next in neighbours.into_iter().flatten() {
            if visited[next] {
                continue;
            }
            let px = img.get_pixel((next % w) as u32, (next / w) as u32);
            if reachable(px) {
                visited[next] = true;
                queue.push_back(next);
            }
        }
    }

    let band = (outer - inner).max(f32::EPSILON);
    for (idx, _) in visited.iter().enumerate().filter(|(_, v)| **v) {
        let px = img.get_pixel_mut((idx % w) as u32, (idx / w) as u32);
        let keep = ((distance(&*px) - inner) / band).clamp(0.0, 1.0);
        let alpha = (px[3] as f32 * keep).round() as u8;
        if alpha == 0 {
            *px = Rgba([0, 0, 0, 0]);
            continue;
        }
        for c in 0..3 {
            let unblended = (px[c] as f32 - (1.0 - keep) * backdrop[c]) / keep;
            px[c] = unblended.round().clamp(0.0, 255.0) as u8;
        }
        px[3] = alpha;
    }
}

/// Per-channel median of the visible border pixels.
fn border_median(img: &RgbaImage) -> Option<[f32; 3]> {
    let mut channels: [Vec<u8>; 3] = Default::default();
    for (x, y) in border_coords(img.width(), img.height()) {
        let px = img.get_pixel(x, y);
        if px[3] == 0 {
            continue;
        }
        for c in 0..3 {
            channels[c].push(px[c]);
        }
    }
    if channels[0].is_empty() {
        return None;
    }

    let mut median = [0.0; 3];
    for (c, values) in channels.iter_mut().enumerate() {
        values.sort_unstable();
        median[c] = values[values.len() / 2] as f32;
    }
    Some(median)
}

fn border_coords(width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
    let top_bottom = (0..width).flat_map(move |x| [(x, 0), (x, height - 1)]);
    let sides = (1..height.saturating_sub(1)).flat_map(move |y| [(0, y), (width - 1, y)]);
    top_bottom.chain(sides)
}

fn color_distance(px: &Rgba<u8>, backdrop: [f32; 3]) -> f32 {
    let dr = px[0] as f32 - backdrop[0];
    let dg = px[1] as f32 - backdrop[1];
    let db = px[2] as f32 - backdrop[2];
    (dr * dr + dg * dg + db * db).sqrt()
}
