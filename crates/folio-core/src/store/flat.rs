//! Exact brute-force [`VectorStore`].
//!
//! Vectors are kept in one contiguous row-major buffer next to their
//! metadata, and both sit behind a single `parking_lot::RwLock` so a
//! reader never sees one without the other. Search is a linear scan.

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{RecordMetadata, SearchHit};

use super::{check_batch, squared_euclidean, IndexSnapshot, VectorStore};

#[derive(Default)]
struct Records {
    /// `len × dims` floats, row-major.
    vectors: Vec<f32>,
    metadatas: Vec<RecordMetadata>,
}

pub struct FlatIndex {
    dims: usize,
    records: RwLock<Records>,
}

impl FlatIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            records: RwLock::new(Records::default()),
        }
    }

    /// Rebuild an index from a snapshot after validating it.
    pub fn restore(snapshot: IndexSnapshot) -> Result<Self> {
        snapshot.validate()?;
        let index = Self::new(snapshot.dims);
        {
            let mut records = index.records.write();
            records.vectors = snapshot.vectors.concat();
            records.metadatas = snapshot.metadatas;
        }
        Ok(index)
    }
}

impl std::fmt::Debug for FlatIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatIndex")
            .field("dims", &self.dims)
            .field("len", &self.len())
            .finish()
    }
}

impl VectorStore for FlatIndex {
    fn dims(&self) -> usize {
        self.dims
    }

    fn len(&self) -> usize {
        self.records.read().metadatas.len()
    }

    fn insert(&self, vectors: Vec<Vec<f32>>, metadatas: Vec<RecordMetadata>) -> Result<()> {
        check_batch(self.dims, &vectors, &metadatas)?;
        let added = vectors.len();
        let flat = vectors.concat();

        let mut records = self.records.write();
        records.vectors.extend_from_slice(&flat);
        records.metadatas.extend(metadatas);
        let total = records.metadatas.len();
        drop(records);

        debug!(added, total, "records inserted");
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let records = self.records.read();
        if records.metadatas.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dims {
            return Err(Error::DimensionMismatch {
                expected: self.dims,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(f32, usize)> = if self.dims == 0 {
            (0..records.metadatas.len()).map(|i| (0.0, i)).collect()
        } else {
            records
                .vectors
                .chunks_exact(self.dims)
                .enumerate()
                .map(|(i, row)| (squared_euclidean(query, row), i))
                .collect()
        };
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, i)| SearchHit {
                metadata: records.metadatas[i].clone(),
                distance,
            })
            .collect())
    }

    fn snapshot(&self) -> IndexSnapshot {
        let records = self.records.read();
        let vectors = if self.dims == 0 {
            vec![Vec::new(); records.metadatas.len()]
        } else {
            records
                .vectors
                .chunks_exact(self.dims)
                .map(<[f32]>::to_vec)
                .collect()
        };
        IndexSnapshot {
            dims: self.dims,
            vectors,
            metadatas: records.metadatas.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> RecordMetadata {
        RecordMetadata::new(name, format!("text of {}", name))
    }

    #[test]
    fn test_exact_vector_has_zero_distance() {
        let index = FlatIndex::new(3);
        let v = vec![0.1, -2.5, 7.25];
        index.insert(vec![v.clone()], vec![meta("a")]).unwrap();
        let hits = index.search(&v, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata, meta("a"));
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn test_len_tracks_successful_inserts() {
        let index = FlatIndex::new(2);
        assert!(index.is_empty());
        index
            .insert(vec![vec![0.0, 0.0], vec![1.0, 1.0]], vec![meta("a"), meta("b")])
            .unwrap();
        index.insert(vec![vec![2.0, 2.0]], vec![meta("c")]).unwrap();
        index.insert(Vec::new(), Vec::new()).unwrap();
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_fresh_index_returns_nothing() {
        let index = FlatIndex::new(4);
        assert!(index.search(&[1.0, 2.0, 3.0, 4.0], 5).unwrap().is_empty());
        // The dimension guard only applies once there is something to compare.
        assert!(index.search(&[1.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_dimension_insert_is_rejected() {
        let index = FlatIndex::new(2);
        index.insert(vec![vec![0.0, 0.0]], vec![meta("a")]).unwrap();
        let err = index
            .insert(vec![vec![1.0, 1.0], vec![1.0, 1.0, 1.0]], vec![meta("b"), meta("c")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(err.is_insert_rejection());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let index = FlatIndex::new(1);
        let err = index
            .insert(vec![vec![0.0], vec![1.0]], vec![meta("a")])
            .unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { vectors: 2, metadatas: 1 }));
        assert!(index.is_empty());
    }

    #[test]
    fn test_ranking_by_distance() {
        let index = FlatIndex::new(1);
        index
            .insert(
                vec![vec![2.0], vec![0.0], vec![1.0]],
                vec![meta("four"), meta("zero"), meta("one")],
            )
            .unwrap();
        let hits = index.search(&[0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.filename, "zero");
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].metadata.filename, "one");
        assert_eq!(hits[1].distance, 1.0);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = FlatIndex::new(1);
        index
            .insert(
                vec![vec![1.0], vec![-1.0], vec![1.0]],
                vec![meta("first"), meta("second"), meta("third")],
            )
            .unwrap();
        let names: Vec<_> = index
            .search(&[0.0], 10)
            .unwrap()
            .into_iter()
            .map(|h| h.metadata.filename)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_k_zero_and_wrong_query_dimension() {
        let index = FlatIndex::new(2);
        index.insert(vec![vec![0.0, 0.0]], vec![meta("a")]).unwrap();
        assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
        assert!(matches!(
            index.search(&[0.0], 1),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_snapshot_and_restore() {
        let index = FlatIndex::new(2);
        index
            .insert(vec![vec![1.0, 2.0], vec![3.0, 4.0]], vec![meta("a"), meta("b")])
            .unwrap();
        let snap = index.snapshot();
        assert_eq!(snap.vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);

        let restored = FlatIndex::restore(snap.clone()).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.snapshot(), snap);
        let hits = restored.search(&[3.0, 4.0], 1).unwrap();
        assert_eq!(hits[0].metadata.filename, "b");

        let broken = IndexSnapshot {
            dims: 3,
            ..snap
        };
        assert!(FlatIndex::restore(broken).is_err());
    }
}
