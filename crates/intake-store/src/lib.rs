//! Intake Storage Layer
//!
//! Implements the `SimilarityIndex` trait using SQLite + an HNSW vector index.
//!
//! # Architecture
//!
//! - SQLite holds every entry: id, vector, body, classification, entities
//! - HNSW answers nearest-neighbour queries and is rebuilt from SQLite on open
//! - A hash-based embedding model for offline runs lives in [`embedding`]
//!
//! # Examples
//!
//! ```
//! use intake_store::SqliteIndex;
//! use intake_domain::traits::SimilarityIndex;
//!
//! let index = SqliteIndex::in_memory(384).unwrap();
//! assert_eq!(index.len().unwrap(), 0);
//! ```

#![warn(missing_docs)]

pub mod embedding;
pub mod vector_index;

use intake_domain::traits::SimilarityIndex;
use intake_domain::{Classification, EntitySet, EntryId, EntryMetadata, IndexEntry, Neighbor};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use vector_index::{VectorIndex, VectorIndexError, DEFAULT_EF_SEARCH};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Vector rejected by the HNSW index
    #[error(transparent)]
    Vector(#[from] VectorIndexError),

    /// Entity set could not be (de)serialised
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An entry with this id already exists
    #[error("Entry already exists: {0}")]
    DuplicateId(EntryId),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-backed similarity index
///
/// Entries are insert-only. Inserting an id that already exists fails with
/// [`StoreError::DuplicateId`] rather than overwriting the stored entry.
///
/// # Thread Safety
///
/// SQLite connections are not `Sync`. Share an index across threads behind a
/// `Mutex`.
pub struct SqliteIndex {
    conn: Connection,
    vectors: VectorIndex,
    ef_search: usize,
}

impl SqliteIndex {
    /// Open (or create) an index file for vectors of `dimension` floats
    ///
    /// Use `:memory:` for an in-memory database.
    pub fn open<P: AsRef<Path>>(path: P, dimension: usize) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn, dimension)
    }

    /// Create a fresh in-memory index
    pub fn in_memory(dimension: usize) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, dimension)
    }

    fn with_connection(conn: Connection, dimension: usize) -> Result<Self, StoreError> {
        let mut index = Self {
            conn,
            vectors: VectorIndex::new(dimension),
            ef_search: DEFAULT_EF_SEARCH,
        };
        index.initialize_schema()?;
        index.rebuild_vectors()?;
        Ok(index)
    }

    /// Set the HNSW search candidate list size
    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search.max(1);
        self
    }

    /// Dimension every vector must have
    pub fn dimension(&self) -> usize {
        self.vectors.dimension()
    }

    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn rebuild_vectors(&mut self) -> Result<(), StoreError> {
        self.vectors.clear();

        let mut stmt = self
            .conn
            .prepare("SELECT id, vector FROM entries ORDER BY created_at, id")?;
        let rows = stmt.query_map([], |row| {
            let id: Vec<u8> = row.get(0)?;
            let vector: Vec<u8> = row.get(1)?;
            Ok((id, vector))
        })?;

        for row in rows {
            let (id_bytes, vector_bytes) = row?;
            let id = Self::bytes_to_entry_id(&id_bytes)?;
            let vector = Self::bytes_to_vector(&vector_bytes)?;
            self.vectors.add(id, &vector)?;
        }

        if !self.vectors.is_empty() {
            info!(entries = self.vectors.len(), "Rebuilt vector index");
        }
        Ok(())
    }

    /// Look up an entry by id
    pub fn get(&self, id: EntryId) -> Result<Option<IndexEntry>, StoreError> {
        let id_bytes = Self::entry_id_to_bytes(id);

        let row = self
            .conn
            .query_row(
                "SELECT vector, body, request_type, sub_request_type, confidence_score, entities
                 FROM entries WHERE id = ?1",
                params![&id_bytes],
                |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((vector, body, request_type, sub_request_type, confidence, entities)) = row else {
            return Ok(None);
        };

        Ok(Some(IndexEntry {
            id,
            vector: Self::bytes_to_vector(&vector)?,
            metadata: EntryMetadata {
                body,
                classification: Classification::new(request_type, sub_request_type, confidence),
                entities: EntitySet::from_value(serde_json::from_str(&entities)?),
            },
        }))
    }

    fn entry_id_to_bytes(id: EntryId) -> Vec<u8> {
        id.value().to_be_bytes().to_vec()
    }

    fn bytes_to_entry_id(bytes: &[u8]) -> Result<EntryId, StoreError> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| {
            StoreError::InvalidData(format!("Expected 16 bytes for EntryId, got {}", bytes.len()))
        })?;
        Ok(EntryId::from_value(u128::from_be_bytes(arr)))
    }

    fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn bytes_to_vector(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
        if bytes.len() % 4 != 0 {
            return Err(StoreError::InvalidData(format!(
                "Vector blob length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }
}

impl SimilarityIndex for SqliteIndex {
    type Error = StoreError;

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Neighbor>, Self::Error> {
        let hits = self.vectors.search(vector, top_k, self.ef_search)?;

        let mut neighbors = Vec::with_capacity(hits.len());
        for (id, score) in hits {
            let entry = self.get(id)?.ok_or_else(|| {
                StoreError::InvalidData(format!("Vector index references missing entry {}", id))
            })?;
            neighbors.push(Neighbor {
                id,
                score,
                metadata: entry.metadata,
            });
        }

        neighbors.sort_by(|a, b| b.score.total_cmp(&a.score));
        neighbors.truncate(top_k);
        debug!(hits = neighbors.len(), "Similarity query");
        Ok(neighbors)
    }

    fn upsert(&mut self, entry: IndexEntry) -> Result<(), Self::Error> {
        self.vectors.check(&entry.vector)?;

        let id_bytes = Self::entry_id_to_bytes(entry.id);
        let classification = &entry.metadata.classification;
        let inserted = self.conn.execute(
            "INSERT INTO entries (id, vector, body, request_type, sub_request_type, confidence_score, entities, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &id_bytes,
                Self::vector_to_bytes(&entry.vector),
                &entry.metadata.body,
                &classification.request_type,
                &classification.sub_request_type,
                classification.confidence_score,
                serde_json::to_string(&entry.metadata.entities)?,
                entry.id.timestamp() as i64,
            ],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::DuplicateId(entry.id));
            }
            Err(e) => return Err(e.into()),
        }

        self.vectors.add(entry.id, &entry.vector)?;
        debug!(id = %entry.id, "Inserted entry");
        Ok(())
    }

    fn contains(&self, id: EntryId) -> Result<bool, Self::Error> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM entries WHERE id = ?1)",
            params![Self::entry_id_to_bytes(id)],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn len(&self) -> Result<usize, Self::Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
