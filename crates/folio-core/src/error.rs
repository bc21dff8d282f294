//! Error taxonomy for the engine.
//!
//! Every failure kind is its own variant so callers can tell an empty
//! retrieval from a generation failure without inspecting messages.

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// Page bytes could not be decoded as an image.
    #[error("Failed to load page image: {0}")]
    ImageLoad(#[from] image::ImageError),

    /// The OCR backend returned an error for a page.
    #[error("OCR failed on page {page}: {source}")]
    Ocr {
        page: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Insert length mismatch: {vectors} vectors but {metadatas} metadata records")]
    LengthMismatch { vectors: usize, metadatas: usize },

    /// The embedding backend failed or returned the wrong number of vectors.
    #[error("Embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Search produced no passages, so generation was not attempted.
    #[error("No passages retrieved for query")]
    EmptyRetrieval,

    #[error("Generation failed: {0}")]
    Generation(#[source] anyhow::Error),

    #[error("No pages supplied for ingestion")]
    NoPages,
}

impl Error {
    /// True for contract violations on the index (the index is unchanged).
    pub fn is_insert_rejection(&self) -> bool {
        matches!(
            self,
            Error::DimensionMismatch { .. } | Error::LengthMismatch { .. }
        )
    }
}
