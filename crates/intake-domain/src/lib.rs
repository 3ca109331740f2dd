//! Intake Domain Layer
//!
//! Core data model and collaborator interfaces for the intake pipeline.
//! Nothing in this crate performs I/O: it defines the values that flow
//! through the pipeline and the traits that infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **Document**: one email or file, reduced to a body of plain text
//! - **Classification**: request type, sub-request type and a confidence score
//! - **Taxonomy**: the permitted request types and their sub-types
//! - **Entity Set**: open-ended structured fields extracted from a document
//! - **Index Entry**: a persisted, classified document and its embedding
//! - **Processed Record**: the per-document output of the pipeline
//!
//! ## Architecture
//!
//! - Pure data and trait definitions only
//! - Embedding, classification, similarity search and text extraction are
//!   collaborators behind the traits in [`traits`]
//! - Infrastructure implementations live in other crates

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classification;
pub mod document;
pub mod entities;
pub mod entry;
pub mod model_output;
pub mod record;
pub mod taxonomy;
pub mod traits;

// Re-exports for convenience
pub use classification::{Classification, FALLBACK_REQUEST_TYPE, FALLBACK_SUB_REQUEST_TYPE};
pub use document::Document;
pub use entities::EntitySet;
pub use entry::{EntryId, EntryMetadata, IndexEntry, Neighbor};
pub use model_output::ModelOutput;
pub use record::ProcessedRecord;
pub use taxonomy::Taxonomy;
