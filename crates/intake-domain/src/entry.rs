//! Similarity index entries - the persisted form of a classified document

use crate::{Classification, EntitySet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Unique identifier for an index entry based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability, so entries list in arrival order
/// - 128-bit uniqueness without coordination between writers
/// - RFC 9562-standard format that vector stores accept as a point id
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntryId(u128);

impl EntryId {
    /// Generate a new UUIDv7-based EntryId
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_domain::EntryId;
    ///
    /// let id = EntryId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create an EntryId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse an EntryId from its hyphenated UUID string
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_domain::EntryId;
    ///
    /// let id = EntryId::new();
    /// let parsed = EntryId::from_string(&id.to_string()).unwrap();
    /// assert_eq!(id, parsed);
    /// ```
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid entry id '{}': {}", s, e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Milliseconds since the Unix epoch encoded in the UUIDv7 prefix
    pub fn timestamp(&self) -> u64 {
        (self.0 >> 80) as u64
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

impl Serialize for EntryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        EntryId::from_string(&s).map_err(serde::de::Error::custom)
    }
}

/// Metadata stored alongside each vector in the similarity index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Original body text of the document
    pub body: String,

    /// Classification assigned when the document was first seen
    pub classification: Classification,

    /// Entities extracted when the document was first seen
    pub entities: EntitySet,
}

impl EntryMetadata {
    /// Confidence score of the stored classification
    pub fn confidence_score(&self) -> f64 {
        self.classification.confidence_score
    }
}

/// A document persisted into the similarity index
///
/// Entries are created exactly once per non-duplicate document and are
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Unique identifier
    pub id: EntryId,

    /// Embedding of the document body
    pub vector: Vec<f32>,

    /// Classification, entities and body text
    pub metadata: EntryMetadata,
}

impl IndexEntry {
    /// Create an entry with a freshly generated id
    pub fn new(vector: Vec<f32>, metadata: EntryMetadata) -> Self {
        Self {
            id: EntryId::new(),
            vector,
            metadata,
        }
    }
}

/// One hit returned by a similarity query
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Id of the matched entry
    pub id: EntryId,

    /// Similarity to the query vector; higher is more similar, 1.0 = identical
    pub score: f32,

    /// Metadata of the matched entry
    pub metadata: EntryMetadata,
}
