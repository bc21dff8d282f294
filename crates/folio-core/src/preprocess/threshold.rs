//! Fixed and adaptive binarisation.

use image::GrayImage;

/// Pixels strictly above `cutoff` become 255, the rest 0.
pub fn binary(page: &GrayImage, cutoff: u8) -> GrayImage {
    let mut out = page.clone();
    let dst: &mut [u8] = &mut out;
    for px in dst.iter_mut() {
        *px = if *px > cutoff { 255 } else { 0 };
    }
    out
}

/// Adaptive threshold against a Gaussian-weighted local mean.
///
/// A pixel becomes 255 when it is brighter than `mean - c`, where `mean` is
/// the Gaussian average of its `block_size × block_size` neighbourhood
/// (edges replicated). `block_size` must be odd.
pub fn adaptive_gaussian(page: &GrayImage, block_size: u32, c: i32) -> GrayImage {
    let mean = gaussian_blur(page, block_size as usize);
    let mut out = page.clone();
    let dst: &mut [u8] = &mut out;
    for (px, m) in dst.iter_mut().zip(mean.iter()) {
        *px = if i32::from(*px) > i32::from(*m) - c { 255 } else { 0 };
    }
    out
}

/// Normalised 1-D Gaussian kernel of odd length `size`.
///
/// Sigma follows the usual derivation from the kernel size:
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let radius = (size / 2) as f64;
    let scale = -0.5 / (sigma * sigma);
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - radius;
            (scale * x * x).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.into_iter().map(|v| (v / sum) as f32).collect()
}

/// Separable Gaussian blur with replicated edges; returns raw row-major luma.
fn gaussian_blur(page: &GrayImage, size: usize) -> Vec<u8> {
    let (w, h) = (page.width() as usize, page.height() as usize);
    let src = page.as_raw();
    let kernel = gaussian_kernel(size);
    let radius = (size / 2) as isize;
    let clamp = |i: isize, n: usize| i.clamp(0, n as isize - 1) as usize;

    let mut horizontal = vec![0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = clamp(x as isize + k as isize - radius, w);
                acc += weight * f32::from(row[sx]);
            }
            horizontal[y * w + x] = acc;
        }
    }

    let mut out = vec![0u8; w * h];
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sy = clamp(y as isize + k as isize - radius, h);
                acc += weight * horizontal[sy * w + x];
            }
            out[y * w + x] = acc.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_binary_cutoff_is_exclusive() {
        let mut page = GrayImage::new(3, 1);
        page.put_pixel(0, 0, Luma([150]));
        page.put_pixel(1, 0, Luma([151]));
        page.put_pixel(2, 0, Luma([10]));
        let out = binary(&page, 150);
        assert_eq!(out.as_raw(), &vec![0, 255, 0]);
    }

    #[test]
    fn test_kernel_is_normalised_and_symmetric() {
        let k = gaussian_kernel(11);
        assert_eq!(k.len(), 11);
        let sum: f32 = k.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        for i in 0..5 {
            assert!((k[i] - k[10 - i]).abs() < 1e-7);
        }
        assert!(k[5] > k[4] && k[4] > k[0]);
    }

    #[test]
    fn test_flat_page_stays_white() {
        // On a flat field the mean equals the pixel, and v > v - c.
        let page = GrayImage::from_pixel(16, 16, Luma([90]));
        let out = adaptive_gaussian(&page, 11, 2);
        assert!(out.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_dark_stroke_on_light_background() {
        let mut page = GrayImage::from_pixel(24, 24, Luma([220]));
        for x in 4..20 {
            page.put_pixel(x, 12, Luma([30]));
        }
        let out = adaptive_gaussian(&page, 11, 2);
        assert_eq!(out.get_pixel(10, 12)[0], 0);
        assert_eq!(out.get_pixel(10, 11)[0], 255);
        assert_eq!(out.get_pixel(2, 2)[0], 255);
    }

    #[test]
    fn test_negative_constant_lowers_foreground() {
        // With c < 0 a flat field fails `v > v - c` and goes black.
        let page = GrayImage::from_pixel(8, 8, Luma([128]));
        let out = adaptive_gaussian(&page, 3, -1);
        assert!(out.pixels().all(|p| p[0] == 0));
    }
}
