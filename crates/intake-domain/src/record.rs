//! Per-document pipeline output

use crate::{Classification, EntitySet, EntryId, Neighbor};
use serde::{Deserialize, Serialize};

/// The result of processing one document
///
/// For a duplicate, every field except `source` is copied from the stored
/// entry the document matched. For a new request, the fields come from the
/// fresh classification and entity extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    /// Path or identifier of the input
    pub source: String,

    /// Top-level request type
    pub request_type: String,

    /// Sub-request type
    pub sub_request_type: String,

    /// Extracted fields
    pub entities: EntitySet,

    /// Whether the document matched an existing entry
    pub is_duplicate: bool,

    /// Classification confidence in [0.0, 1.0]
    pub confidence_score: f64,

    /// Id of the matched entry, for duplicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<EntryId>,
}

impl ProcessedRecord {
    /// Record for a document that matched an existing entry
    pub fn duplicate(source: impl Into<String>, neighbor: &Neighbor) -> Self {
        let metadata = &neighbor.metadata;
        Self {
            source: source.into(),
            request_type: metadata.classification.request_type.clone(),
            sub_request_type: metadata.classification.sub_request_type.clone(),
            entities: metadata.entities.clone(),
            is_duplicate: true,
            confidence_score: metadata.classification.confidence_score,
            duplicate_of: Some(neighbor.id),
        }
    }

    /// Record for a newly classified document
    pub fn new_request(
        source: impl Into<String>,
        classification: &Classification,
        entities: EntitySet,
    ) -> Self {
        Self {
            source: source.into(),
            request_type: classification.request_type.clone(),
            sub_request_type: classification.sub_request_type.clone(),
            entities,
            is_duplicate: false,
            confidence_score: classification.confidence_score,
            duplicate_of: None,
        }
    }
}
