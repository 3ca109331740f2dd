//! HNSW Vector Index for Nearest-Neighbour Search
//!
//! In-memory approximate nearest-neighbour index over entry embeddings.
//! The index is not persisted; [`crate::SqliteIndex`] rebuilds it from the
//! `entries` table on open.
//!
//! # HNSW Parameters
//!
//! - **M**: Number of bi-directional links per node (default: 16)
//! - **efConstruction**: Candidate list size during construction (default: 200)
//! - **efSearch**: Candidate list size during search (default: 64)

use hnsw_rs::prelude::*;
use intake_domain::EntryId;
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_M: usize = 16;
const DEFAULT_EF_CONSTRUCTION: usize = 200;
const DEFAULT_MAX_ELEMENTS: usize = 1_000_000;

/// Default candidate list size for searches
pub const DEFAULT_EF_SEARCH: usize = 64;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// Vector holds NaN or infinite components
    #[error("Embedding contains non-finite values")]
    NonFinite,

    /// All components are zero, so cosine distance is undefined
    #[error("Embedding has zero norm")]
    ZeroNorm,
}

/// A wrapper around HNSW keyed by [`EntryId`]
///
/// Similarity scores are `1 - cosine distance`, so 1.0 means identical
/// direction.
///
/// # Examples
///
/// ```
/// use intake_store::vector_index::VectorIndex;
/// use intake_domain::EntryId;
///
/// let mut index = VectorIndex::new(3);
/// let id = EntryId::new();
/// index.add(id, &[1.0, 0.0, 0.0]).unwrap();
///
/// let results = index.search(&[1.0, 0.0, 0.0], 1, 64).unwrap();
/// assert_eq!(results[0].0, id);
/// ```
pub struct VectorIndex {
    dimension: usize,
    hnsw: Hnsw<'static, f32, DistCosine>,
    id_map: HashMap<usize, EntryId>,
    next_id: usize,
}

fn new_hnsw() -> Hnsw<'static, f32, DistCosine> {
    let nb_layer = 16.min((DEFAULT_MAX_ELEMENTS as f32).ln().trunc() as usize);
    Hnsw::<'static, f32, DistCosine>::new(
        DEFAULT_M,
        DEFAULT_MAX_ELEMENTS,
        nb_layer,
        DEFAULT_EF_CONSTRUCTION,
        DistCosine {},
    )
}

impl VectorIndex {
    /// Create an empty index for vectors of `dimension` floats
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            hnsw: new_hnsw(),
            id_map: HashMap::new(),
            next_id: 0,
        }
    }

    /// Dimension every vector must have
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Reject vectors of the wrong length or with non-finite components
    pub fn check(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VectorIndexError::NonFinite);
        }
        if vector.iter().all(|v| *v == 0.0) {
            return Err(VectorIndexError::ZeroNorm);
        }
        Ok(())
    }

    /// Add an entry's vector
    pub fn add(&mut self, id: EntryId, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.check(vector)?;

        let internal_id = self.next_id;
        self.next_id += 1;
        self.id_map.insert(internal_id, id);
        self.hnsw.insert((vector, internal_id));

        Ok(())
    }

    /// The `k` nearest entries to `query` as `(id, similarity)`, best first
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
    ) -> Result<Vec<(EntryId, f32)>, VectorIndexError> {
        self.check(query)?;
        if k == 0 || self.id_map.is_empty() {
            return Ok(Vec::new());
        }

        let mut results: Vec<(EntryId, f32)> = self
            .hnsw
            .search(query, k, ef_search.max(k))
            .into_iter()
            .filter_map(|neighbour| {
                self.id_map
                    .get(&neighbour.d_id)
                    .map(|&id| (id, 1.0 - neighbour.distance))
            })
            .collect();

        results.sort_by(|a, b| b.1.total_cmp(&a.1));
        results.truncate(k);
        Ok(results)
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.id_map.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.id_map.is_empty()
    }

    /// Remove every vector
    pub fn clear(&mut self) {
        self.hnsw = new_hnsw();
        self.id_map.clear();
        self.next_id = 0;
    }
}
