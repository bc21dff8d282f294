//! Non-local-means denoising for 8-bit grayscale pages.
//!
//! Each output pixel is a weighted average of the pixels in its search
//! window, where the weight of a candidate depends on how similar the
//! template patch around it is to the patch around the target:
//!
//! ```text
//! w(p, q) = exp(-mean((P(p) - P(q))²) / h²)
//! ```
//!
//! Patch distances are computed one displacement at a time with a summed
//! area table, so the cost is `O(search² × pixels)` instead of
//! `O(search² × template² × pixels)`. Borders reflect without repeating the
//! edge pixel.

use image::GrayImage;

/// Largest possible mean squared difference between two 8-bit patches.
const MAX_MEAN_DISTANCE: usize = 255 * 255;

pub fn non_local_means(
    page: &GrayImage,
    strength: f32,
    template_window: u32,
    search_window: u32,
) -> GrayImage {
    let (w, h) = (page.width() as usize, page.height() as usize);
    if w == 0 || h == 0 {
        return page.clone();
    }

    let tr = (template_window / 2) as usize;
    let sr = (search_window / 2) as usize;
    let pad = tr + sr;
    let padded = reflect_pad(page, pad);
    let pw = w + 2 * pad;

    // Extended region covers every pixel touched by a template around an
    // image pixel.
    let ew = w + 2 * tr;
    let eh = h + 2 * tr;
    let stride = ew + 1;
    let mut table = vec![0u64; stride * (eh + 1)];

    let patch_area = ((2 * tr + 1) * (2 * tr + 1)) as u64;
    let weights = weight_table(strength);

    let mut weight_sum = vec![0f32; w * h];
    let mut value_sum = vec![0f32; w * h];

    let sr = sr as isize;
    for dy in -sr..=sr {
        for dx in -sr..=sr {
            // Summed area table of squared differences at this displacement.
            for ey in 0..eh {
                let py = ey + sr as usize;
                let qy = (py as isize + dy) as usize;
                let mut row_acc = 0u64;
                for ex in 0..ew {
                    let px = ex + sr as usize;
                    let qx = (px as isize + dx) as usize;
                    let a = i32::from(padded[py * pw + px]);
                    let b = i32::from(padded[qy * pw + qx]);
                    let d = (a - b) * (a - b);
                    row_acc += d as u64;
                    table[(ey + 1) * stride + ex + 1] = table[ey * stride + ex + 1] + row_acc;
                }
            }

            for y in 0..h {
                let y1 = y + 2 * tr + 1;
                let qy = (y + pad) as isize + dy;
                for x in 0..w {
                    let x1 = x + 2 * tr + 1;
                    let ssd = table[y1 * stride + x1] + table[y * stride + x]
                        - table[y * stride + x1]
                        - table[y1 * stride + x];
                    let mean = ((ssd + patch_area / 2) / patch_area) as usize;
                    let weight = weights[mean.min(MAX_MEAN_DISTANCE)];
                    let qx = (x + pad) as isize + dx;
                    let q = f32::from(padded[qy as usize * pw + qx as usize]);
                    let i = y * w + x;
                    weight_sum[i] += weight;
                    value_sum[i] += weight * q;
                }
            }
        }
    }

    let mut out = GrayImage::new(w as u32, h as u32);
    let dst: &mut [u8] = &mut out;
    for (i, px) in dst.iter_mut().enumerate() {
        // The zero displacement always contributes weight 1.
        *px = (value_sum[i] / weight_sum[i]).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// `exp(-d / h²)` for every integer mean distance `d`.
fn weight_table(strength: f32) -> Vec<f32> {
    let h2 = f64::from(strength) * f64::from(strength);
    (0..=MAX_MEAN_DISTANCE)
        .map(|d| (-(d as f64) / h2).exp() as f32)
        .collect()
}

/// Copy `page` into a buffer padded by `pad` on every side, mirroring
/// around the edge pixels (`dcb|abcd|cba`).
fn reflect_pad(page: &GrayImage, pad: usize) -> Vec<u8> {
    let (w, h) = (page.width() as usize, page.height() as usize);
    let src = page.as_raw();
    let pw = w + 2 * pad;
    let ph = h + 2 * pad;
    let mut out = vec![0u8; pw * ph];
    for y in 0..ph {
        let sy = reflect_101(y as isize - pad as isize, h);
        for x in 0..pw {
            let sx = reflect_101(x as isize - pad as isize, w);
            out[y * pw + x] = src[sy * w + sx];
        }
    }
    out
}

fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let i = i.rem_euclid(period);
    if i >= n as isize {
        (period - i) as usize
    } else {
        i as usize
    }
}
