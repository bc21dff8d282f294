//! `folio extract`: preprocess, recognise and correct page images.
//!
//! Prints the corrected text of each page, or with `--json` one object per
//! page carrying the raw OCR text, its bounding boxes, the corrected text
//! and the measured skew.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use folio_core::models::BoundingBox;

use crate::app;
use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct PageExtraction {
    pub file: String,
    pub skew_degrees: f64,
    pub raw_text: String,
    pub corrected_text: String,
    pub boxes: Vec<BoundingBox>,
}

/// Run the engine's per-page pipeline on one image file.
pub async fn extract_file(
    engine: &folio_core::Engine,
    path: &Path,
    save_prepared: Option<&Path>,
) -> Result<PageExtraction> {
    let bytes = app::read_page(path)?;
    let page = engine
        .extract_page(0, &bytes)
        .await
        .with_context(|| format!("Failed to extract {}", path.display()))?;

    if let Some(dir) = save_prepared {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".to_string());
        let out = dir.join(format!("{}.prepared.png", stem));
        page.prepared
            .image
            .save_with_format(&out, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", out.display()))?;
        info!(path = %out.display(), "prepared page saved");
    }

    Ok(PageExtraction {
        file: app::document_label(path),
        skew_degrees: page.prepared.skew_degrees,
        raw_text: page.extracted.text,
        corrected_text: page.corrected_text,
        boxes: page.extracted.boxes,
    })
}

pub async fn run_extract(
    config: &Config,
    images: &[PathBuf],
    json: bool,
    save_prepared: Option<PathBuf>,
) -> Result<()> {
    for path in images {
        app::check_page_path(path)?;
    }

    let ocr = crate::ocr::create_engine(&config.ocr)?;
    // Extraction never embeds or generates, so those backends stay disabled.
    let engine = app::build_engine_with(
        config,
        ocr,
        std::sync::Arc::new(crate::embedding::DisabledProvider),
        std::sync::Arc::new(crate::generation::DisabledGenerator),
    )?;

    let mut pages = Vec::with_capacity(images.len());
    for path in images {
        pages.push(extract_file(&engine, path, save_prepared.as_deref()).await?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }

    for (i, page) in pages.iter().enumerate() {
        if images.len() > 1 {
            if i > 0 {
                println!();
            }
            println!("== {} (skew {:.2}°)", page.file, page.skew_degrees);
        }
        println!("{}", page.corrected_text);
    }
    Ok(())
}
