//! The retrieval-augmented QA engine.
//!
//! An [`Engine`] owns the shared vector index and the three capability
//! backends. It is built once with an [`EngineBuilder`] and shared by
//! reference (`Arc<Engine>`) between concurrent requests; no global state
//! is involved.
//!
//! # Ingestion
//!
//! ```text
//! page bytes ─▶ preprocess ─▶ OCR ─▶ correct ─┐
//!                                             ├─▶ join "\n" ─▶ chunk ─▶ embed ─▶ insert
//! page bytes ─▶ preprocess ─▶ OCR ─▶ correct ─┘
//! ```
//!
//! Undecodable pages are skipped and reported on the receipt; an OCR
//! failure on any page fails the whole document.
//!
//! # Query
//!
//! ```text
//! question ─▶ embed ─▶ search(k) ─▶ assemble ─▶ generate
//! ```
//!
//! An empty search result short-circuits with [`Error::EmptyRetrieval`]
//! before the generator is called.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assemble::ContextAssembler;
use crate::chunk::chunk_text;
use crate::correct::TextCorrector;
use crate::embedding::{embed_one, Embedder};
use crate::error::{Error, Result};
use crate::generation::Generator;
use crate::models::{Answer, ExtractedText, IngestReceipt, RecordMetadata, SearchHit, SkippedPage};
use crate::ocr::OcrEngine;
use crate::preprocess::{ImagePreprocessor, PreparedPage};
use crate::store::flat::FlatIndex;
use crate::store::VectorStore;

/// One page after preprocessing, OCR and correction.
#[derive(Debug, Clone)]
pub struct ProcessedPage {
    pub prepared: PreparedPage,
    /// Raw OCR output, before correction.
    pub extracted: ExtractedText,
    pub corrected_text: String,
}

pub struct Engine {
    preprocessor: ImagePreprocessor,
    corrector: TextCorrector,
    assembler: ContextAssembler,
    chunk_chars: usize,
    ocr: Arc<dyn OcrEngine>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    index: Arc<dyn VectorStore>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("ocr", &self.ocr.name())
            .field("embedder", &self.embedder.model_name())
            .field("generator", &self.generator.model_name())
            .field("records", &self.index.len())
            .finish()
    }
}

impl Engine {
    pub fn builder(
        ocr: Arc<dyn OcrEngine>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> EngineBuilder {
        EngineBuilder {
            preprocessor: ImagePreprocessor::default(),
            corrector: TextCorrector::default(),
            assembler: ContextAssembler::default(),
            chunk_chars: 0,
            ocr,
            embedder,
            generator,
            index: None,
        }
    }

    pub fn index(&self) -> &dyn VectorStore {
        self.index.as_ref()
    }

    pub fn preprocessor(&self) -> &ImagePreprocessor {
        &self.preprocessor
    }

    pub fn corrector(&self) -> &TextCorrector {
        &self.corrector
    }

    /// Preprocess, recognise and correct a single page.
    ///
    /// `page` is the zero-based position used in error reports.
    pub async fn extract_page(&self, page: usize, bytes: &[u8]) -> Result<ProcessedPage> {
        let prepared = self.preprocessor.prepare_bytes(bytes)?;
        let extracted = self
            .ocr
            .recognize(&prepared.image)
            .await
            .map_err(|source| Error::Ocr { page, source })?;
        if !extracted.is_consistent() {
            warn!(
                page,
                ocr = self.ocr.name(),
                tokens = extracted.text.split_whitespace().count(),
                boxes = extracted.boxes.len(),
                "OCR boxes do not match the recognised tokens"
            );
        }
        debug!(
            page,
            tokens = extracted.boxes.len(),
            skew_degrees = prepared.skew_degrees,
            "page recognised"
        );
        let corrected_text = self.corrector.correct(&extracted.text);
        Ok(ProcessedPage {
            prepared,
            extracted,
            corrected_text,
        })
    }

    /// Ingest the pages of one document under `label`.
    pub async fn ingest<B: AsRef<[u8]>>(&self, pages: &[B], label: &str) -> Result<IngestReceipt> {
        if pages.is_empty() {
            return Err(Error::NoPages);
        }

        let mut texts = Vec::with_capacity(pages.len());
        let mut skipped = Vec::new();
        let mut first_load_error = None;
        for (i, page) in pages.iter().enumerate() {
            match self.extract_page(i, page.as_ref()).await {
                Ok(processed) => texts.push(processed.corrected_text),
                Err(Error::ImageLoad(err)) => {
                    warn!(label, page = i, error = %err, "skipping undecodable page");
                    skipped.push(SkippedPage {
                        page: i,
                        reason: err.to_string(),
                    });
                    if first_load_error.is_none() {
                        first_load_error = Some(err);
                    }
                }
                Err(other) => return Err(other),
            }
        }
        if texts.is_empty() {
            return Err(match first_load_error {
                Some(err) => Error::ImageLoad(err),
                None => Error::NoPages,
            });
        }

        let corrected_text = texts.join("\n");
        let passages = chunk_text(&corrected_text, self.chunk_chars);
        let vectors = self
            .embedder
            .embed(&passages)
            .await
            .map_err(Error::Embedding)?;
        if vectors.len() != passages.len() {
            return Err(Error::Embedding(anyhow::anyhow!(
                "Embedder {} returned {} vectors for {} passages",
                self.embedder.model_name(),
                vectors.len(),
                passages.len()
            )));
        }

        let page_count = texts.len();
        let metadatas: Vec<RecordMetadata> = passages
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                RecordMetadata::new(label, text)
                    .with_chunk_index(i)
                    .with_page_count(page_count)
            })
            .collect();
        let records_inserted = metadatas.len();
        self.index.insert(vectors, metadatas)?;

        info!(
            label,
            pages = page_count,
            skipped = skipped.len(),
            records = records_inserted,
            "document ingested"
        );

        Ok(IngestReceipt {
            label: label.to_string(),
            corrected_text,
            records_inserted,
            skipped_pages: skipped,
        })
    }

    /// Embed `text` and return its `k` nearest records.
    pub async fn query_by_text(&self, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let vector = embed_one(self.embedder.as_ref(), text)
            .await
            .map_err(Error::Embedding)?;
        self.index.search(&vector, k)
    }

    /// Retrieve the `k` passages closest to `query` and generate an answer
    /// grounded on them.
    pub async fn retrieve_and_answer(&self, query: &str, k: usize) -> Result<Answer> {
        let passages = self.query_by_text(query, k).await?;
        if passages.is_empty() {
            return Err(Error::EmptyRetrieval);
        }

        let prompt = self.assembler.assemble(query, &passages);
        debug!(
            passages = passages.len(),
            context_words = prompt.context.split_whitespace().count(),
            "prompt assembled"
        );
        let answer = self
            .generator
            .generate(&prompt.to_string())
            .await
            .map_err(Error::Generation)?;

        info!(
            passages = passages.len(),
            top = %passages[0].metadata.filename,
            "query answered"
        );

        Ok(Answer {
            query: query.to_string(),
            answer,
            passages,
        })
    }
}

pub struct EngineBuilder {
    preprocessor: ImagePreprocessor,
    corrector: TextCorrector,
    assembler: ContextAssembler,
    chunk_chars: usize,
    ocr: Arc<dyn OcrEngine>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    index: Option<Arc<dyn VectorStore>>,
}

impl EngineBuilder {
    pub fn preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn corrector(mut self, corrector: TextCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    pub fn assembler(mut self, assembler: ContextAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    /// Passage size for chunking; `0` keeps one record per document.
    pub fn chunk_chars(mut self, max_chars: usize) -> Self {
        self.chunk_chars = max_chars;
        self
    }

    /// Use an existing index instead of a fresh [`FlatIndex`].
    pub fn index(mut self, index: Arc<dyn VectorStore>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let dims = self.embedder.dims();
        let index = match self.index {
            Some(index) => {
                if index.dims() != dims {
                    return Err(Error::DimensionMismatch {
                        expected: dims,
                        actual: index.dims(),
                    });
                }
                index
            }
            None => Arc::new(FlatIndex::new(dims)) as Arc<dyn VectorStore>,
        };
        Ok(Engine {
            preprocessor: self.preprocessor,
            corrector: self.corrector,
            assembler: self.assembler,
            chunk_chars: self.chunk_chars,
            ocr: self.ocr,
            embedder: self.embedder,
            generator: self.generator,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedText;
    use async_trait::async_trait;
    use image::{DynamicImage, GrayImage, Luma};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits a fixed script of page texts, one per call.
    struct ScriptedOcr {
        pages: Vec<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OcrEngine for ScriptedOcr {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn recognize(&self, _page: &GrayImage) -> anyhow::Result<ExtractedText> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.pages.get(i) {
                Some(&"<fail>") => anyhow::bail!("engine crashed"),
                Some(text) => Ok(ExtractedText {
                    text: text.to_string(),
                    boxes: Vec::new(),
                }),
                None => Ok(ExtractedText::default()),
            }
        }
    }

    /// Character-length embedding.
    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn model_name(&self) -> &str {
            "length"
        }

        fn dims(&self) -> usize {
            1
        }

        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        fn model_name(&self) -> &str {
            "echo"
        }

        async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            Ok(format!("echo: {}", prompt.len()))
        }
    }

    fn png_page() -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(GrayImage::from_pixel(24, 24, Luma([255])))
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn engine(pages: Vec<&'static str>) -> Engine {
        let ocr = Arc::new(ScriptedOcr {
            pages,
            calls: AtomicUsize::new(0),
        });
        Engine::builder(ocr, Arc::new(LengthEmbedder), Arc::new(EchoGenerator))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_extract_page_keeps_raw_and_corrected_text() {
        let engine = engine(vec!["Kerala  Jniversity"]);
        let page = engine.extract_page(0, &png_page()).await.unwrap();
        assert_eq!(page.extracted.text, "Kerala  Jniversity");
        assert_eq!(page.corrected_text, "Kerala University");
        assert_eq!(page.prepared.image.dimensions(), (24, 24));
        // The scripted adapter reports no boxes; extraction still succeeds.
        assert!(!page.extracted.is_consistent());
    }

    #[tokio::test]
    async fn test_pages_are_joined_with_newlines() {
        let engine = engine(vec!["first  page", "second page"]);
        let receipt = engine.ingest(&[png_page(), png_page()], "doc.png").await.unwrap();
        assert_eq!(receipt.label, "doc.png");
        assert_eq!(receipt.corrected_text, "first page\nsecond page");
        assert_eq!(receipt.records_inserted, 1);
        assert_eq!(engine.index().len(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_page_is_skipped() {
        let engine = engine(vec!["kept"]);
        let pages: Vec<Vec<u8>> = vec![b"junk".to_vec(), png_page()];
        let receipt = engine.ingest(&pages, "doc").await.unwrap();
        assert_eq!(receipt.corrected_text, "kept");
        assert_eq!(receipt.skipped_pages.len(), 1);
        assert_eq!(receipt.skipped_pages[0].page, 0);
    }

    #[tokio::test]
    async fn test_all_pages_undecodable() {
        let engine = engine(vec![]);
        let err = engine.ingest(&[b"junk".to_vec()], "doc").await.unwrap_err();
        assert!(matches!(err, Error::ImageLoad(_)));
        assert!(engine.index().is_empty());
    }

    #[tokio::test]
    async fn test_no_pages() {
        let engine = engine(vec![]);
        let pages: Vec<Vec<u8>> = Vec::new();
        assert!(matches!(engine.ingest(&pages, "doc").await, Err(Error::NoPages)));
    }

    #[tokio::test]
    async fn test_ocr_failure_fails_document() {
        let engine = engine(vec!["fine", "<fail>"]);
        let err = engine
            .ingest(&[png_page(), png_page()], "doc")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Ocr { page: 1, .. }));
        assert!(engine.index().is_empty());
    }

    #[tokio::test]
    async fn test_chunked_ingest_records_positions() {
        let ocr = Arc::new(ScriptedOcr {
            pages: vec!["alpha beta gamma delta"],
            calls: AtomicUsize::new(0),
        });
        let engine = Engine::builder(ocr, Arc::new(LengthEmbedder), Arc::new(EchoGenerator))
            .chunk_chars(10)
            .build()
            .unwrap();
        let receipt = engine.ingest(&[png_page()], "doc").await.unwrap();
        assert_eq!(receipt.records_inserted, 3);
        let snap = engine.index().snapshot();
        let indices: Vec<usize> = snap.metadatas.iter().map(|m| m.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(snap.metadatas.iter().all(|m| m.page_count == 1));
    }

    #[tokio::test]
    async fn test_empty_index_short_circuits() {
        let engine = engine(vec![]);
        let err = engine.retrieve_and_answer("anything?", 3).await.unwrap_err();
        assert!(matches!(err, Error::EmptyRetrieval));
    }

    #[tokio::test]
    async fn test_k_zero_short_circuits() {
        let engine = engine(vec!["text"]);
        engine.ingest(&[png_page()], "doc").await.unwrap();
        let err = engine.retrieve_and_answer("q", 0).await.unwrap_err();
        assert!(matches!(err, Error::EmptyRetrieval));
    }

    #[tokio::test]
    async fn test_answer_carries_passages() {
        let engine = engine(vec!["some text"]);
        engine.ingest(&[png_page()], "doc").await.unwrap();
        let answer = engine.retrieve_and_answer("what?", 5).await.unwrap();
        assert_eq!(answer.passages.len(), 1);
        assert!(answer.answer.starts_with("echo: "));
    }

    #[test]
    fn test_index_dimension_must_match_embedder() {
        let ocr = Arc::new(ScriptedOcr {
            pages: vec![],
            calls: AtomicUsize::new(0),
        });
        let result = Engine::builder(ocr, Arc::new(LengthEmbedder), Arc::new(EchoGenerator))
            .index(Arc::new(FlatIndex::new(8)))
            .build();
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 1,
                actual: 8
            })
        ));
    }
}
