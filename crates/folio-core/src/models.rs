//! Core data models that flow through the ingestion and query paths.
//!
//! Pages and extracted text live for one ingestion call; records live as
//! long as the index that owns them; prompts live for one query.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single recognised token and its position on the page, in pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub token: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// OCR output for one page.
///
/// `boxes` follow the engine's reading order and hold one entry per
/// non-empty whitespace token of `text`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedText {
    pub text: String,
    pub boxes: Vec<BoundingBox>,
}

impl ExtractedText {
    /// Build from recognised tokens, dropping blank ones so the
    /// token/box correspondence holds.
    pub fn from_boxes(boxes: Vec<BoundingBox>) -> Self {
        let boxes: Vec<BoundingBox> = boxes
            .into_iter()
            .filter_map(|mut b| {
                let trimmed = b.token.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.len() != b.token.len() {
                    b.token = trimmed.to_string();
                }
                Some(b)
            })
            .collect();
        let text = boxes
            .iter()
            .map(|b| b.token.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, boxes }
    }

    /// True when every non-empty token in `text` has exactly one box.
    pub fn is_consistent(&self) -> bool {
        self.text.split_whitespace().count() == self.boxes.len()
    }
}

/// Metadata stored next to each vector in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Source label of the document (usually the uploaded file name).
    pub filename: String,
    /// Passage text that was embedded.
    pub text: String,
    /// Position of this passage within its document.
    #[serde(default)]
    pub chunk_index: usize,
    /// Number of pages that contributed text to the document.
    #[serde(default)]
    pub page_count: usize,
    /// SHA-256 of `text`, hex encoded.
    #[serde(default)]
    pub content_hash: String,
    /// Free-form caller fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RecordMetadata {
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let content_hash = content_hash(&text);
        Self {
            filename: filename.into(),
            text,
            chunk_index: 0,
            page_count: 0,
            content_hash,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_chunk_index(mut self, index: usize) -> Self {
        self.chunk_index = index;
        self
    }

    pub fn with_page_count(mut self, pages: usize) -> Self {
        self.page_count = pages;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// One nearest-neighbour hit, as returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub metadata: RecordMetadata,
    /// Squared Euclidean distance to the query vector.
    pub distance: f32,
}

/// Confirmation returned by a successful ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub label: String,
    /// Corrected text of every decoded page, joined by newlines.
    pub corrected_text: String,
    pub records_inserted: usize,
    /// Pages that could not be decoded and were skipped.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_pages: Vec<SkippedPage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedPage {
    /// Zero-based page position in the ingest call.
    pub page: usize,
    pub reason: String,
}

/// Result of a question answered against the index.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub query: String,
    pub answer: String,
    pub passages: Vec<SearchHit>,
}

/// SHA-256 of `text` as lowercase hex.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
