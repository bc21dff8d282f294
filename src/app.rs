//! Engine construction from configuration, and page file handling.
//!
//! [`build_engine`] resolves the configured backends and hands them to
//! [`build_engine_with`], which applies the remaining sections
//! (preprocessing, correction, retrieval, chunking). Tests call
//! `build_engine_with` directly with in-process backends.

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use folio_core::assemble::ContextAssembler;
use folio_core::correct::{Dictionary, FrequencyDictionary, NoDictionary, TextCorrector};
use folio_core::embedding::Embedder;
use folio_core::generation::Generator;
use folio_core::ocr::OcrEngine;
use folio_core::preprocess::ImagePreprocessor;
use folio_core::Engine;

use crate::config::{Config, CorrectionConfig};
use crate::{embedding, generation, ocr};

/// Raster formats accepted as page images.
pub const PAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

pub fn build_engine(config: &Config) -> Result<Engine> {
    let ocr = ocr::create_engine(&config.ocr)?;
    let embedder = embedding::create_provider(&config.embedding)?;
    let generator = generation::create_generator(&config.generation)?;
    build_engine_with(config, ocr, embedder, generator)
}

pub fn build_engine_with(
    config: &Config,
    ocr: Arc<dyn OcrEngine>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
) -> Result<Engine> {
    let corrector = build_corrector(&config.correction)?;
    info!(
        ocr = ocr.name(),
        embedder = embedder.model_name(),
        dims = embedder.dims(),
        generator = generator.model_name(),
        dictionary = corrector.dictionary_version(),
        "engine configured"
    );
    let engine = Engine::builder(ocr, embedder, generator)
        .preprocessor(ImagePreprocessor::new(config.preprocess.clone()))
        .corrector(corrector)
        .assembler(ContextAssembler::new(config.retrieval.max_words))
        .chunk_chars(config.chunking.max_chars)
        .build()?;
    Ok(engine)
}

/// Corrector with the configured dictionary (if any) and substitutions.
///
/// The dictionary version is its file name.
pub fn build_corrector(config: &CorrectionConfig) -> Result<TextCorrector> {
    let dictionary: Arc<dyn Dictionary> = match &config.dictionary {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read dictionary: {}", path.display()))?;
            let version = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let dict = FrequencyDictionary::parse(version, &source);
            if dict.is_empty() {
                bail!("Dictionary {} contains no words", path.display());
            }
            Arc::new(dict)
        }
        None => Arc::new(NoDictionary),
    };
    Ok(TextCorrector::new(dictionary).with_substitutions(config.substitutions.clone()))
}

/// Check that `path` names a supported raster page image.
pub fn check_page_path(path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if ext == "pdf" {
        bail!(
            "{}: PDF input is not supported; render each page to an image first \
             (e.g. `pdftoppm -png -r 300 {} page`)",
            path.display(),
            path.display()
        );
    }
    if !PAGE_EXTENSIONS.contains(&ext.as_str()) {
        bail!(
            "{}: unsupported page format '{}'. Supported: {}",
            path.display(),
            ext,
            PAGE_EXTENSIONS.join(", ")
        );
    }
    Ok(())
}

/// Read a page image after checking its extension.
pub fn read_page(path: &Path) -> Result<Vec<u8>> {
    check_page_path(path)?;
    std::fs::read(path).with_context(|| format!("Failed to read page: {}", path.display()))
}

/// Document label for a page file: its file name.
pub fn document_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// The page images making up one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPages {
    /// File name of the first page.
    pub label: String,
    pub pages: Vec<PathBuf>,
}

/// Parse a `--doc` value: one page path, or several joined by commas.
///
/// Every page is checked for a supported extension.
pub fn parse_document(arg: &str) -> Result<DocumentPages> {
    let pages: Vec<PathBuf> = arg
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .collect();
    let Some(first) = pages.first() else {
        bail!("Empty document: '{}' names no pages", arg);
    };
    for page in &pages {
        check_page_path(page)?;
    }
    Ok(DocumentPages {
        label: document_label(first),
        pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_page_extensions() {
        assert!(check_page_path(Path::new("scan.PNG")).is_ok());
        assert!(check_page_path(Path::new("a/b/certificate.tiff")).is_ok());
        let err = check_page_path(Path::new("report.pdf")).unwrap_err();
        assert!(err.to_string().contains("PDF input is not supported"));
        assert!(check_page_path(Path::new("notes.txt")).is_err());
        assert!(check_page_path(Path::new("no_extension")).is_err());
    }

    #[test]
    fn test_document_label_is_file_name() {
        assert_eq!(document_label(&PathBuf::from("/tmp/scans/deed.jpg")), "deed.jpg");
    }

    #[test]
    fn test_document_with_several_pages() {
        let doc = parse_document("scans/deed-1.png, scans/deed-2.png").unwrap();
        assert_eq!(doc.label, "deed-1.png");
        assert_eq!(
            doc.pages,
            vec![PathBuf::from("scans/deed-1.png"), PathBuf::from("scans/deed-2.png")]
        );
        assert_eq!(parse_document("one.jpg").unwrap().pages.len(), 1);
        assert!(parse_document(" , ").is_err());
        assert!(parse_document("a.png,b.pdf").is_err());
    }

    #[test]
    fn test_corrector_without_dictionary() {
        let corrector = build_corrector(&CorrectionConfig::default()).unwrap();
        assert_eq!(corrector.dictionary_version(), "none");
        assert_eq!(corrector.correct("Kerala Jniversity"), "Kerala University");
    }

    #[test]
    fn test_corrector_with_dictionary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("en.txt");
        std::fs::write(&path, "capital 10\nfrance 5\n").unwrap();
        let corrector = build_corrector(&CorrectionConfig {
            dictionary: Some(path),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(corrector.dictionary_version(), "en.txt");
        assert_eq!(corrector.correct("capitl of Frances"), "capital of France");
    }

    #[test]
    fn test_empty_dictionary_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        std::fs::write(&path, "# nothing here\n").unwrap();
        let result = build_corrector(&CorrectionConfig {
            dictionary: Some(path),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
