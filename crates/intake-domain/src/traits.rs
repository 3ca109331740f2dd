//! Trait definitions for external interactions
//!
//! These traits define the boundaries between the pipeline and its
//! collaborators. All of them are synchronous; the pipeline moves each call
//! onto a blocking thread and applies its own timeout.

use crate::{
    Classification, Document, EntitySet, EntryId, IndexEntry, ModelOutput, Neighbor, Taxonomy,
};
use std::path::Path;

/// Trait for turning text into fixed-length vectors
///
/// Implemented by the infrastructure layer (intake-llm, intake-store)
pub trait EmbeddingService {
    /// Error type for embedding operations
    type Error;

    /// Embed a text into a vector of [`EmbeddingService::dimension`] floats
    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error>;

    /// Length of every vector this service produces
    fn dimension(&self) -> usize;
}

/// Trait for classifying documents and extracting their fields
///
/// Implemented by the application layer (intake-classifier)
pub trait ClassificationService {
    /// Error type for transport failures
    type Error;

    /// Classify a text against a taxonomy
    ///
    /// Output the model produced but that could not be parsed is
    /// `Ok(ModelOutput::Malformed { .. })`, not an error.
    fn classify(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
    ) -> Result<ModelOutput<Classification>, Self::Error>;

    /// Extract structured fields from a text
    fn extract_entities(&self, text: &str) -> Result<ModelOutput<EntitySet>, Self::Error>;
}

/// Trait for a nearest-neighbour store of classified documents
///
/// Implemented by the infrastructure layer (intake-store)
pub trait SimilarityIndex {
    /// Error type for index operations
    type Error;

    /// Find up to `top_k` entries nearest to `vector`, best first
    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Neighbor>, Self::Error>;

    /// Insert a new entry; an entry with an existing id is an error
    fn upsert(&mut self, entry: IndexEntry) -> Result<(), Self::Error>;

    /// Whether an entry with this id is stored
    fn contains(&self, id: EntryId) -> Result<bool, Self::Error>;

    /// Number of stored entries
    fn len(&self) -> Result<usize, Self::Error>;

    /// Whether the index holds no entries
    fn is_empty(&self) -> Result<bool, Self::Error> {
        Ok(self.len()? == 0)
    }
}

/// Trait for reading a document's body text from disk
///
/// Implemented by the infrastructure layer (intake-ingest)
pub trait DocumentSource {
    /// Error type for extraction failures
    type Error;

    /// Read a file and reduce it to a [`Document`]
    fn extract_body(&self, path: &Path) -> Result<Document, Self::Error>;
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (intake-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate a free-text completion
    fn generate(&self, system: &str, prompt: &str) -> Result<String, Self::Error>;

    /// Generate a completion constrained to JSON, if the provider supports it
    fn generate_json(&self, system: &str, prompt: &str) -> Result<String, Self::Error>;
}
