//! Page preprocessing ahead of OCR.
//!
//! Conditions a raw page image so OCR handles it reliably. The pipeline is
//! fixed and deterministic; every step feeds the next:
//!
//! 1. Grayscale (BT.601 luma).
//! 2. Binary threshold at a fixed cutoff. Kept on [`PreparedPage`] but not
//!    used downstream.
//! 3. Non-local-means denoising of the grayscale image.
//! 4. Adaptive Gaussian threshold of the denoised image.
//! 5. Deskew of the thresholded mask from its minimum-area rectangle.
//! 6. Linear contrast boost.
//!
//! # Example
//!
//! ```rust
//! use folio_core::preprocess::{ImagePreprocessor, PreprocessConfig};
//! use image::{DynamicImage, GrayImage, Luma};
//!
//! let page = GrayImage::from_pixel(32, 24, Luma([255u8]));
//! let prepared = ImagePreprocessor::new(PreprocessConfig::default())
//!     .prepare(&DynamicImage::ImageLuma8(page));
//! assert_eq!(prepared.image.dimensions(), (32, 24));
//! assert_eq!(prepared.skew_degrees, 0.0);
//! ```

pub mod denoise;
pub mod deskew;
pub mod threshold;

use anyhow::{bail, Result};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Error;

/// Tunables for [`ImagePreprocessor`]. Defaults are the reference values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Cutoff for the initial binary mask (pixel > cutoff → white).
    pub binary_cutoff: u8,
    /// Non-local-means filter strength `h`.
    pub denoise_strength: f32,
    /// Side of the square patch compared by the denoiser (odd).
    pub template_window: u32,
    /// Side of the square neighbourhood searched for similar patches (odd).
    pub search_window: u32,
    /// Side of the Gaussian neighbourhood used by the adaptive threshold (odd).
    pub adaptive_block: u32,
    /// Constant subtracted from the Gaussian mean.
    pub adaptive_c: i32,
    /// Gain applied by the final contrast step.
    pub contrast_gain: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            binary_cutoff: 150,
            denoise_strength: 30.0,
            template_window: 7,
            search_window: 21,
            adaptive_block: 11,
            adaptive_c: 2,
            contrast_gain: 1.5,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("template_window", self.template_window),
            ("search_window", self.search_window),
            ("adaptive_block", self.adaptive_block),
        ] {
            if value < 3 || value % 2 == 0 {
                bail!("preprocess.{} must be an odd number >= 3 (got {})", name, value);
            }
        }
        if self.denoise_strength.is_nan() || self.denoise_strength <= 0.0 {
            bail!("preprocess.denoise_strength must be > 0");
        }
        if self.contrast_gain.is_nan() || self.contrast_gain < 0.0 {
            bail!("preprocess.contrast_gain must be >= 0");
        }
        Ok(())
    }
}

/// Output of [`ImagePreprocessor::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedPage {
    /// Page ready for OCR.
    pub image: GrayImage,
    /// Fixed-cutoff mask from step 2.
    pub binary_mask: GrayImage,
    /// Rotation applied by the deskew step, degrees counter-clockwise.
    pub skew_degrees: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ImagePreprocessor {
    config: PreprocessConfig,
}

impl ImagePreprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Decode encoded page bytes (PNG, JPEG, TIFF, BMP) and prepare them.
    pub fn prepare_bytes(&self, bytes: &[u8]) -> Result<PreparedPage, Error> {
        let decoded = image::load_from_memory(bytes)?;
        Ok(self.prepare(&decoded))
    }

    pub fn prepare(&self, page: &DynamicImage) -> PreparedPage {
        let cfg = &self.config;
        let gray = to_grayscale(page);
        let binary_mask = threshold::binary(&gray, cfg.binary_cutoff);
        let denoised = denoise::non_local_means(
            &gray,
            cfg.denoise_strength,
            cfg.template_window,
            cfg.search_window,
        );
        let mask = threshold::adaptive_gaussian(&denoised, cfg.adaptive_block, cfg.adaptive_c);
        let skew_degrees = deskew::skew_angle(&mask);
        let deskewed = deskew::rotate(&mask, skew_degrees);
        let image = scale_contrast(&deskewed, cfg.contrast_gain);

        debug!(
            width = gray.width(),
            height = gray.height(),
            skew_degrees,
            "page preprocessed"
        );

        PreparedPage {
            image,
            binary_mask,
            skew_degrees,
        }
    }
}

/// Convert to 8-bit luma with BT.601 weights (0.299 R + 0.587 G + 0.114 B).
///
/// Alpha is discarded. Uses 14-bit fixed point so results are exact
/// integers independent of float rounding.
pub fn to_grayscale(page: &DynamicImage) -> GrayImage {
    if let DynamicImage::ImageLuma8(gray) = page {
        return gray.clone();
    }
    let rgb = page.to_rgb8();
    let (width, height) = rgb.dimensions();
    let mut out = GrayImage::new(width, height);
    let dst: &mut [u8] = &mut out;
    for (px, chunk) in dst.iter_mut().zip(rgb.as_raw().chunks_exact(3)) {
        let r = u32::from(chunk[0]);
        let g = u32::from(chunk[1]);
        let b = u32::from(chunk[2]);
        *px = ((r * 4899 + g * 9617 + b * 1868 + (1 << 13)) >> 14) as u8;
    }
    out
}

/// `saturate(round(gain * v))` per pixel, no offset.
pub fn scale_contrast(page: &GrayImage, gain: f32) -> GrayImage {
    let mut out = page.clone();
    let dst: &mut [u8] = &mut out;
    for px in dst.iter_mut() {
        *px = (f32::from(*px) * gain).round().clamp(0.0, 255.0) as u8;
    }
    out
}
