//! Error types for the pipeline

use intake_domain::{IndexEntry, ProcessedRecord};
use std::fmt;
use thiserror::Error;

/// A step of the per-document pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Reading the document body
    Extraction,
    /// Embedding the body
    Embedding,
    /// Nearest-neighbour lookup
    IndexQuery,
    /// Request type classification
    Classification,
    /// Structured field extraction
    EntityExtraction,
    /// Writing the new entry to the index
    Persistence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "extraction",
            Stage::Embedding => "embedding",
            Stage::IndexQuery => "index query",
            Stage::Classification => "classification",
            Stage::EntityExtraction => "entity extraction",
            Stage::Persistence => "persistence",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while processing a document
///
/// Every variant names the stage that failed. A failed index query is never
/// treated as "no duplicate".
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The document body could not be read, or is blank
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// The embedding service failed or returned an unusable vector
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// The similarity index could not be queried
    #[error("Index query failed: {0}")]
    IndexQuery(String),

    /// The classification service failed (classification or entity extraction)
    #[error("Classification failed: {0}")]
    Classification(String),

    /// The model answered, but the answer could not be parsed
    #[error("Malformed {stage} output: {reason}")]
    MalformedOutput {
        /// Stage whose output was malformed
        stage: Stage,
        /// Why parsing failed
        reason: String,
    },

    /// Classification succeeded but the new entry was not persisted
    ///
    /// The record and the entry are carried so the caller can report the
    /// result and retry the write without classifying again.
    #[error("Persisting entry {} failed: {reason}", .entry.id)]
    PersistenceFailed {
        /// The record that would have been returned
        record: Box<ProcessedRecord>,
        /// The entry that was not written
        entry: Box<IndexEntry>,
        /// Why the write failed
        reason: String,
    },

    /// A stage did not finish within the configured timeout
    #[error("{stage} timed out")]
    Timeout {
        /// Stage that timed out
        stage: Stage,
    },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// The stage that failed, if the error belongs to one
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Extraction(_) => Some(Stage::Extraction),
            PipelineError::Embedding(_) => Some(Stage::Embedding),
            PipelineError::IndexQuery(_) => Some(Stage::IndexQuery),
            PipelineError::Classification(_) => Some(Stage::Classification),
            PipelineError::MalformedOutput { stage, .. } => Some(*stage),
            PipelineError::PersistenceFailed { .. } => Some(Stage::Persistence),
            PipelineError::Timeout { stage } => Some(*stage),
            PipelineError::Config(_) => None,
        }
    }

    /// Whether a record was produced even though the run failed
    pub fn is_partial_success(&self) -> bool {
        matches!(self, PipelineError::PersistenceFailed { .. })
    }

    /// The record carried by a partial success
    pub fn partial_record(&self) -> Option<&ProcessedRecord> {
        match self {
            PipelineError::PersistenceFailed { record, .. } => Some(record.as_ref()),
            _ => None,
        }
    }

    /// Take the record and the unwritten entry out of a partial success
    pub fn into_partial(self) -> Result<(ProcessedRecord, IndexEntry), Self> {
        match self {
            PipelineError::PersistenceFailed { record, entry, .. } => Ok((*record, *entry)),
            other => Err(other),
        }
    }
}
