//! Local embedding model for offline runs and tests
//!
//! [`MockEmbeddingModel`] produces deterministic embeddings from text hashes.
//! Identical texts map to identical vectors and unrelated texts to nearly
//! orthogonal ones, which is enough to drive duplicate detection end to end
//! without a model server.
//!
//! # Examples
//!
//! ```rust
//! use intake_store::embedding::MockEmbeddingModel;
//! use intake_domain::traits::EmbeddingService;
//!
//! let model = MockEmbeddingModel::new(384);
//! let text = "Please increase the commitment by $5M";
//! let embedding = model.embed(text).unwrap();
//! assert_eq!(embedding.len(), 384);
//!
//! // Same text always produces same embedding
//! assert_eq!(embedding, model.embed(text).unwrap());
//! ```

use intake_domain::traits::EmbeddingService;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Hash-based embedding model
///
/// The embeddings are:
///
/// - **Deterministic**: Same text always produces same embedding
/// - **Normalized**: All vectors have unit length (for cosine similarity)
/// - **Diverse**: Different texts produce different embeddings
///
/// Whitespace is collapsed before hashing, so texts differing only in
/// line breaks or indentation embed identically.
#[derive(Debug, Clone)]
pub struct MockEmbeddingModel {
    dimension: usize,
}

impl MockEmbeddingModel {
    /// Create a new mock embedding model
    ///
    /// # Parameters
    ///
    /// - `dimension`: The embedding dimension (e.g., 384 for all-MiniLM-L6-v2)
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn hash_with_seed(text: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        seed.hash(&mut hasher);
        let hash_value = hasher.finish();

        // Map to [-1, 1]
        let normalized = (hash_value as f64 / u64::MAX as f64) * 2.0 - 1.0;
        normalized as f32
    }
}

impl EmbeddingService for MockEmbeddingModel {
    type Error = EmbeddingError;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        let canonical = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if canonical.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding: Vec<f32> = (0..self.dimension)
            .map(|i| Self::hash_with_seed(&canonical, i as u64))
            .collect();

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Cosine similarity between two vectors
///
/// Returns a value in [-1, 1]: 1.0 for identical direction, 0.0 for
/// orthogonal vectors. Vectors of different lengths, or a zero vector,
/// give 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
