//! OCR backends.
//!
//! [`TesseractEngine`] drives the `tesseract` command-line engine: the
//! prepared page is written to a temporary PNG, recognised with TSV
//! output, and the word rows are turned into tokens with bounding boxes.
//! [`DisabledOcr`] refuses every page.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use image::GrayImage;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use folio_core::models::{BoundingBox, ExtractedText};
use folio_core::ocr::OcrEngine;

use crate::config::OcrConfig;

/// TSV row level for single words.
const WORD_LEVEL: &str = "5";

pub struct DisabledOcr;

#[async_trait]
impl OcrEngine for DisabledOcr {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn recognize(&self, _page: &GrayImage) -> Result<ExtractedText> {
        bail!("OCR provider is disabled; set [ocr] provider = \"tesseract\" in the config")
    }
}

pub struct TesseractEngine {
    binary: String,
    languages: String,
    user_words: Option<PathBuf>,
    timeout: Duration,
}

impl TesseractEngine {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            languages: config.languages.clone(),
            user_words: config.user_words.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, page: &GrayImage) -> Result<ExtractedText> {
        let input = tempfile::Builder::new()
            .prefix("folio-page-")
            .suffix(".png")
            .tempfile()
            .context("Failed to create temporary page file")?;
        page.save_with_format(input.path(), image::ImageFormat::Png)
            .context("Failed to write temporary page file")?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages);
        if let Some(words) = &self.user_words {
            cmd.arg("--user-words").arg(words);
        }
        cmd.arg("tsv").kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .with_context(|| format!("{} timed out after {:?}", self.binary, self.timeout))?
            .with_context(|| format!("Failed to run {} (is it installed?)", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{} exited with {}: {}", self.binary, output.status, stderr.trim());
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let extracted = parse_tsv(&tsv)?;
        debug!(
            tokens = extracted.boxes.len(),
            languages = %self.languages,
            "tesseract recognised page"
        );
        Ok(extracted)
    }
}

/// Parse Tesseract TSV output into tokens in reading order.
///
/// Columns: `level page block par line word left top width height conf text`.
/// Only word rows with non-blank text are kept.
pub fn parse_tsv(tsv: &str) -> Result<ExtractedText> {
    let mut boxes = Vec::new();
    for (line_no, line) in tsv.lines().enumerate() {
        if line_no == 0 && line.starts_with("level") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.splitn(12, '\t').collect();
        if cols.len() < 12 {
            bail!("Malformed tesseract TSV row {}: {:?}", line_no + 1, line);
        }
        if cols[0] != WORD_LEVEL || cols[11].trim().is_empty() {
            continue;
        }
        let num = |i: usize| -> Result<u32> {
            cols[i]
                .trim()
                .parse()
                .with_context(|| format!("Bad number in tesseract TSV row {}", line_no + 1))
        };
        boxes.push(BoundingBox {
            token: cols[11].to_string(),
            x: num(6)?,
            y: num(7)?,
            width: num(8)?,
            height: num(9)?,
        });
    }
    Ok(ExtractedText::from_boxes(boxes))
}

/// Create the configured [`OcrEngine`].
pub fn create_engine(config: &OcrConfig) -> Result<Arc<dyn OcrEngine>> {
    match config.provider.as_str() {
        "tesseract" => Ok(Arc::new(TesseractEngine::new(config))),
        "disabled" => Ok(Arc::new(DisabledOcr)),
        other => bail!("Unknown OCR provider: {}", other),
    }
}
