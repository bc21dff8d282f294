//! OCR backend trait.

use anyhow::Result;
use async_trait::async_trait;
use image::GrayImage;

use crate::models::ExtractedText;

/// Recognises text on a preprocessed page.
///
/// Implementations return tokens in reading order with one bounding box
/// per non-empty token; [`ExtractedText::from_boxes`] builds a consistent
/// value from raw recognitions.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short backend identifier used in logs.
    fn name(&self) -> &str;

    async fn recognize(&self, page: &GrayImage) -> Result<ExtractedText>;
}
