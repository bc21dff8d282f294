//! End-to-end tests: the engine with in-process backends, the config
//! loader, and the `folio` binary's input checks.

use async_trait::async_trait;
use image::{DynamicImage, GrayImage, Luma};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use folio::app::{build_engine_with, parse_document};
use folio::ask::ingest_documents;
use folio::config::{load_config, Config};
use folio_core::embedding::Embedder;
use folio_core::generation::Generator;
use folio_core::models::ExtractedText;
use folio_core::ocr::OcrEngine;
use folio_core::Error;

fn folio_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_folio"))
}

/// Recognises a page by its width, which survives preprocessing.
struct WidthKeyedOcr {
    pages: HashMap<u32, &'static str>,
}

#[async_trait]
impl OcrEngine for WidthKeyedOcr {
    fn name(&self) -> &str {
        "width-keyed"
    }

    async fn recognize(&self, page: &GrayImage) -> anyhow::Result<ExtractedText> {
        let text = self
            .pages
            .get(&page.width())
            .ok_or_else(|| anyhow::anyhow!("no text for page width {}", page.width()))?;
        Ok(ExtractedText {
            text: text.to_string(),
            boxes: Vec::new(),
        })
    }
}

/// Normalised bag-of-words over a fixed vocabulary.
struct VocabularyEmbedder {
    vocabulary: Vec<&'static str>,
}

impl VocabularyEmbedder {
    fn new() -> Self {
        Self {
            vocabulary: vec![
                "paris", "is", "the", "capital", "of", "france", "invoice", "total", "dollars",
                "what",
            ],
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.vocabulary.len()];
        for word in text.split_whitespace() {
            let word: String = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            if let Some(i) = self.vocabulary.iter().position(|w| *w == word) {
                v[i] += 1.0;
            }
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for VocabularyEmbedder {
    fn model_name(&self) -> &str {
        "vocabulary"
    }

    fn dims(&self) -> usize {
        self.vocabulary.len()
    }

    async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

/// Answers with the first word of the context and records every prompt.
#[derive(Default)]
struct FirstWordGenerator {
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl Generator for FirstWordGenerator {
    fn model_name(&self) -> &str {
        "first-word"
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let context = prompt
            .strip_prefix("Context: ")
            .ok_or_else(|| anyhow::anyhow!("unexpected prompt shape"))?;
        Ok(context
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string())
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        anyhow::bail!("model overloaded")
    }
}

fn blank_page(width: u32) -> Vec<u8> {
    let mut buf = std::io::Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(GrayImage::from_pixel(width, 30, Luma([255])))
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn two_document_ocr() -> Arc<WidthKeyedOcr> {
    Arc::new(WidthKeyedOcr {
        pages: HashMap::from([
            (40, "Paris is the capital of France"),
            (50, "The invoice total is 42 dollars"),
        ]),
    })
}

#[tokio::test]
async fn test_capital_question_end_to_end() {
    let generator = Arc::new(FirstWordGenerator::default());
    let engine = build_engine_with(
        &Config::default(),
        two_document_ocr(),
        Arc::new(VocabularyEmbedder::new()),
        generator.clone(),
    )
    .unwrap();

    let receipt = engine.ingest(&[blank_page(40)], "capital.png").await.unwrap();
    assert_eq!(receipt.label, "capital.png");
    assert_eq!(receipt.corrected_text, "Paris is the capital of France");
    engine.ingest(&[blank_page(50)], "invoice.png").await.unwrap();
    assert_eq!(engine.index().len(), 2);

    let answer = engine
        .retrieve_and_answer("What is the capital of France?", 1)
        .await
        .unwrap();
    assert_eq!(answer.passages.len(), 1);
    assert_eq!(answer.passages[0].metadata.filename, "capital.png");
    assert_eq!(answer.answer, "Paris");

    let prompts = generator.prompts.lock().unwrap();
    assert_eq!(
        prompts[0],
        "Context: Paris is the capital of France\n\nQuestion: What is the capital of France?\nAnswer:"
    );
}

#[tokio::test]
async fn test_ranked_passages_are_ascending() {
    let engine = build_engine_with(
        &Config::default(),
        two_document_ocr(),
        Arc::new(VocabularyEmbedder::new()),
        Arc::new(FirstWordGenerator::default()),
    )
    .unwrap();
    engine.ingest(&[blank_page(50)], "invoice.png").await.unwrap();
    engine.ingest(&[blank_page(40)], "capital.png").await.unwrap();

    let hits = engine.query_by_text("capital of France", 5).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].metadata.filename, "capital.png");
    assert!(hits[0].distance <= hits[1].distance);
    assert!(hits.iter().all(|h| h.distance >= 0.0));
}

#[tokio::test]
async fn test_generation_failure_is_typed() {
    let engine = build_engine_with(
        &Config::default(),
        two_document_ocr(),
        Arc::new(VocabularyEmbedder::new()),
        Arc::new(FailingGenerator),
    )
    .unwrap();
    engine.ingest(&[blank_page(40)], "capital.png").await.unwrap();
    let err = engine.retrieve_and_answer("capital?", 1).await.unwrap_err();
    assert!(matches!(err, Error::Generation(_)));
}

#[tokio::test]
async fn test_concurrent_ingest_and_query() {
    let engine = Arc::new(
        build_engine_with(
            &Config::default(),
            two_document_ocr(),
            Arc::new(VocabularyEmbedder::new()),
            Arc::new(FirstWordGenerator::default()),
        )
        .unwrap(),
    );

    let mut tasks = Vec::new();
    for i in 0..8u32 {
        let engine = Arc::clone(&engine);
        tasks.push(tokio::spawn(async move {
            let width = if i % 2 == 0 { 40 } else { 50 };
            engine
                .ingest(&[blank_page(width)], &format!("doc-{}.png", i))
                .await
                .unwrap();
            let hits = engine.query_by_text("capital of France", 4).await.unwrap();
            assert!(!hits.is_empty());
            assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(engine.index().len(), 8);
}

#[tokio::test]
async fn test_chunking_config_splits_records() {
    let mut config = Config::default();
    config.chunking.max_chars = 12;
    let engine = build_engine_with(
        &config,
        two_document_ocr(),
        Arc::new(VocabularyEmbedder::new()),
        Arc::new(FirstWordGenerator::default()),
    )
    .unwrap();
    let receipt = engine.ingest(&[blank_page(40)], "capital.png").await.unwrap();
    assert_eq!(receipt.records_inserted, 3);
    let texts: Vec<String> = engine
        .index()
        .snapshot()
        .metadatas
        .into_iter()
        .map(|m| m.text)
        .collect();
    assert_eq!(texts, vec!["Paris is the", "capital of", "France"]);
}

#[tokio::test]
async fn test_multi_page_document_is_one_record() {
    let tmp = TempDir::new().unwrap();
    let first = tmp.path().join("deed-1.png");
    let second = tmp.path().join("deed-2.png");
    fs::write(&first, blank_page(40)).unwrap();
    fs::write(&second, blank_page(50)).unwrap();

    let engine = build_engine_with(
        &Config::default(),
        two_document_ocr(),
        Arc::new(VocabularyEmbedder::new()),
        Arc::new(FirstWordGenerator::default()),
    )
    .unwrap();
    let doc = parse_document(&format!("{},{}", first.display(), second.display())).unwrap();
    assert_eq!(ingest_documents(&engine, &[doc]).await.unwrap(), 1);

    let records = engine.index().snapshot().metadatas;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].filename, "deed-1.png");
    assert_eq!(records[0].page_count, 2);
    assert_eq!(
        records[0].text,
        "Paris is the capital of France\nThe invoice total is 42 dollars"
    );
}

#[tokio::test]
async fn test_undecodable_page_leaves_rest_of_document() {
    let tmp = TempDir::new().unwrap();
    let broken = tmp.path().join("scan-1.png");
    let good = tmp.path().join("scan-2.png");
    fs::write(&broken, b"not an image").unwrap();
    fs::write(&good, blank_page(40)).unwrap();

    let engine = build_engine_with(
        &Config::default(),
        two_document_ocr(),
        Arc::new(VocabularyEmbedder::new()),
        Arc::new(FirstWordGenerator::default()),
    )
    .unwrap();
    let doc = parse_document(&format!("{},{}", broken.display(), good.display())).unwrap();
    assert_eq!(ingest_documents(&engine, &[doc]).await.unwrap(), 1);

    let records = engine.index().snapshot().metadatas;
    assert_eq!(records[0].filename, "scan-1.png");
    assert_eq!(records[0].page_count, 1);
    assert_eq!(records[0].text, "Paris is the capital of France");
}

#[test]
fn test_load_config_from_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("folio.toml");
    fs::write(
        &path,
        r#"
[ocr]
languages = "eng"

[retrieval]
top_k = 3
max_words = 128

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.ocr.languages, "eng");
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.retrieval.max_words, 128);
    assert_eq!(config.embedding.dims, Some(768));
    assert_eq!(config.generation.provider, "disabled");
}

#[test]
fn test_load_config_rejects_invalid_values() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("folio.toml");
    fs::write(&path, "[preprocess]\nsearch_window = 20\n").unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(err.to_string().contains("search_window"));

    assert!(load_config(&tmp.path().join("missing.toml")).is_err());
}

#[test]
fn test_cli_rejects_pdf_input() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("folio.toml");
    fs::write(&config, "").unwrap();
    let pdf = tmp.path().join("scan.pdf");
    fs::write(&pdf, b"%PDF-1.4\n").unwrap();

    let output = Command::new(folio_binary())
        .args(["--config", config.to_str().unwrap(), "extract", pdf.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PDF input is not supported"), "stderr: {}", stderr);
}

#[test]
fn test_cli_reports_missing_config() {
    let tmp = TempDir::new().unwrap();
    let output = Command::new(folio_binary())
        .args([
            "--config",
            tmp.path().join("nope.toml").to_str().unwrap(),
            "extract",
            "page.png",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}
