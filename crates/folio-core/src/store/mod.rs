//! Vector storage abstraction.
//!
//! The [`VectorStore`] trait is the contract every nearest-neighbour
//! backend satisfies. [`FlatIndex`](flat::FlatIndex) is the exact
//! brute-force reference; an approximate structure can stand in for it as
//! long as it honours the same ordering and error rules.
//!
//! Implementations must be `Send + Sync`: one index is shared by every
//! concurrent request of an [`Engine`](crate::engine::Engine).

pub mod flat;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{RecordMetadata, SearchHit};

/// Nearest-neighbour index over fixed-dimension vectors.
///
/// # Contract
///
/// | Method | Behaviour |
/// |--------|-----------|
/// | [`insert`](VectorStore::insert) | All-or-nothing append; rejects length or dimension mismatches |
/// | [`search`](VectorStore::search) | Up to `k` hits, ascending squared Euclidean distance, ties by insertion order |
/// | [`snapshot`](VectorStore::snapshot) | Owned copy of every record, in insertion order |
pub trait VectorStore: Send + Sync {
    /// Dimension every stored vector has.
    fn dims(&self) -> usize;

    /// Number of stored records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `vectors[i]` with `metadatas[i]` for every `i`.
    ///
    /// On error nothing is stored.
    fn insert(&self, vectors: Vec<Vec<f32>>, metadatas: Vec<RecordMetadata>) -> Result<()>;

    /// The `min(k, len())` closest records to `query`.
    ///
    /// An empty index yields an empty list whatever the query.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    fn snapshot(&self) -> IndexSnapshot;
}

/// Every record of an index, detached from its lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub dims: usize,
    pub vectors: Vec<Vec<f32>>,
    pub metadatas: Vec<RecordMetadata>,
}

impl IndexSnapshot {
    /// Check the parallel-sequence and dimension invariants.
    pub fn validate(&self) -> Result<()> {
        check_batch(self.dims, &self.vectors, &self.metadatas)
    }
}

/// Rejection rules shared by inserts and restores.
pub(crate) fn check_batch(
    dims: usize,
    vectors: &[Vec<f32>],
    metadatas: &[RecordMetadata],
) -> Result<()> {
    if vectors.len() != metadatas.len() {
        return Err(Error::LengthMismatch {
            vectors: vectors.len(),
            metadatas: metadatas.len(),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
        return Err(Error::DimensionMismatch {
            expected: dims,
            actual: bad.len(),
        });
    }
    Ok(())
}

/// Squared Euclidean distance. Both slices must have the same length.
pub fn squared_euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}
