//! Core pipeline implementation

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Stage};
use crate::normalize::normalize;
use crate::types::DocumentOutcome;
use futures::stream::{self, StreamExt};
use intake_domain::traits::{
    ClassificationService, DocumentSource, EmbeddingService, SimilarityIndex,
};
use intake_domain::{
    Classification, Document, EntitySet, EntryMetadata, IndexEntry, ModelOutput,
    ProcessedRecord, Taxonomy,
};
use std::fmt::{self, Display};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Failure of one collaborator call
enum CallError {
    Failed(String),
    TimedOut(Duration),
}

impl CallError {
    fn into_error(self, stage: Stage, failed: fn(String) -> PipelineError) -> PipelineError {
        match self {
            CallError::Failed(msg) => failed(msg),
            CallError::TimedOut(_) => PipelineError::Timeout { stage },
        }
    }
}

impl Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::Failed(msg) => f.write_str(msg),
            CallError::TimedOut(limit) => write!(f, "timed out after {:?}", limit),
        }
    }
}

/// The duplicate-detection and classification pipeline
///
/// Each document is embedded once and compared with its nearest stored
/// neighbour. A close enough match reuses the stored classification; anything
/// else is classified, has its fields extracted, and is stored as a new entry.
///
/// Collaborators are synchronous. Every call runs on the blocking thread pool
/// under the configured stage timeout. The index lock is held for one query
/// or one insert at a time, so query-then-insert is not atomic: two
/// near-identical documents processed concurrently may both be stored.
pub struct Pipeline<E, C, I> {
    embedder: Arc<E>,
    classifier: Arc<C>,
    index: Arc<Mutex<I>>,
    config: Arc<PipelineConfig>,
}

impl<E, C, I> Pipeline<E, C, I>
where
    E: EmbeddingService + Send + Sync + 'static,
    E::Error: Display,
    C: ClassificationService + Send + Sync + 'static,
    C::Error: Display,
    I: SimilarityIndex + Send + 'static,
    I::Error: Display,
{
    /// Create a new pipeline
    pub fn new(
        embedder: E,
        classifier: C,
        index: I,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::Config)?;
        Ok(Self {
            embedder: Arc::new(embedder),
            classifier: Arc::new(classifier),
            index: Arc::new(Mutex::new(index)),
            config: Arc::new(config),
        })
    }

    /// Current configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Taxonomy passed to every classification call
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.config.taxonomy
    }

    /// The embedding service
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// The classification service
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Process one document
    ///
    /// Embeds the body exactly once. Duplicates make no classification call
    /// and no index write; new documents make one classification call, one
    /// entity extraction call and one index write.
    pub async fn process(&self, document: Document) -> Result<ProcessedRecord, PipelineError> {
        if document.is_blank() {
            return Err(PipelineError::Extraction(format!(
                "{}: document body is empty",
                document.source
            )));
        }

        let Document { source, body } = document;
        let body: Arc<str> = body.into();
        info!(source = %source, chars = body.chars().count(), "Processing document");

        let vector = self.embed(Arc::clone(&body)).await?;

        let index = Arc::clone(&self.index);
        let query = vector.clone();
        let top_k = self.config.top_k;
        let neighbors = self
            .call(move || {
                let index = index
                    .lock()
                    .map_err(|_| "index lock poisoned".to_string())?;
                index.query(&query, top_k).map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| e.into_error(Stage::IndexQuery, PipelineError::IndexQuery))?;

        if let Some(nearest) = neighbors.into_iter().next() {
            // Compare in f32 so a score equal to the threshold is not above it
            if nearest.score > self.config.duplicate_threshold as f32 {
                info!(
                    source = %source,
                    score = nearest.score,
                    duplicate_of = %nearest.id,
                    "Duplicate detected"
                );
                return Ok(ProcessedRecord::duplicate(source, &nearest));
            }
            debug!(source = %source, score = nearest.score, "Nearest entry below duplicate threshold");
        } else {
            debug!(source = %source, "Index is empty");
        }

        let (classification, entities) =
            tokio::join!(self.classify(Arc::clone(&body)), self.extract(Arc::clone(&body)));
        let classification = classification?;
        let entities = entities?;

        let record = ProcessedRecord::new_request(source, &classification, entities.clone());
        let entry = IndexEntry::new(
            vector,
            EntryMetadata {
                body: body.to_string(),
                classification,
                entities,
            },
        );

        self.persist(record, entry).await
    }

    /// Process documents concurrently, at most `max_concurrency` at a time
    ///
    /// Outcomes come back in input order. A failed document does not stop
    /// the others.
    pub async fn process_batch(&self, documents: Vec<Document>) -> Vec<DocumentOutcome> {
        stream::iter(documents.into_iter().map(|document| async move {
            let source = document.source.clone();
            let result = self.process(document).await;
            if let Err(e) = &result {
                warn!(source = %source, "Document failed: {}", e);
            }
            DocumentOutcome { source, result }
        }))
        .buffered(self.config.max_concurrency)
        .collect()
        .await
    }

    /// Read each path with `source`, then process it as in [`Pipeline::process_batch`]
    ///
    /// Read failures become `Extraction` outcomes.
    pub async fn process_paths<S>(&self, source: Arc<S>, paths: Vec<PathBuf>) -> Vec<DocumentOutcome>
    where
        S: DocumentSource + Send + Sync + 'static,
        S::Error: Display,
    {
        stream::iter(paths.into_iter().map(|path| {
            let reader = Arc::clone(&source);
            async move {
                let label = path.display().to_string();
                let result = match self
                    .call(move || reader.extract_body(&path).map_err(|e| e.to_string()))
                    .await
                {
                    Ok(document) => self.process(document).await,
                    Err(e) => Err(e.into_error(Stage::Extraction, |msg| {
                        PipelineError::Extraction(msg)
                    })),
                };
                if let Err(e) = &result {
                    warn!(source = %label, "Document failed: {}", e);
                }
                DocumentOutcome {
                    source: label,
                    result,
                }
            }
        }))
        .buffered(self.config.max_concurrency)
        .collect()
        .await
    }

    /// Write an entry left behind by a `PersistenceFailed` error
    ///
    /// Nothing is classified again. A write that timed out may still have
    /// landed, so an entry whose id is already stored counts as written.
    /// Fails with `PersistenceFailed` once more if the write still does not
    /// succeed.
    pub async fn retry_upsert(
        &self,
        record: ProcessedRecord,
        entry: IndexEntry,
    ) -> Result<ProcessedRecord, PipelineError> {
        let index = Arc::clone(&self.index);
        let id = entry.id;
        let stored = self
            .call(move || {
                let index = index
                    .lock()
                    .map_err(|_| "index lock poisoned".to_string())?;
                index.contains(id).map_err(|e| e.to_string())
            })
            .await;

        match stored {
            Ok(true) => {
                info!(id = %id, source = %record.source, "Entry already stored");
                return Ok(record);
            }
            Ok(false) => {}
            Err(e) => debug!(id = %id, "Could not check for stored entry: {}", e),
        }

        info!(id = %id, source = %record.source, "Retrying index write");
        self.persist(record, entry).await
    }

    /// Number of entries in the index
    pub async fn index_len(&self) -> Result<usize, PipelineError> {
        let index = Arc::clone(&self.index);
        self.call(move || {
            let index = index
                .lock()
                .map_err(|_| "index lock poisoned".to_string())?;
            index.len().map_err(|e| e.to_string())
        })
        .await
        .map_err(|e| e.into_error(Stage::IndexQuery, PipelineError::IndexQuery))
    }

    async fn embed(&self, body: Arc<str>) -> Result<Vec<f32>, PipelineError> {
        let embedder = Arc::clone(&self.embedder);
        let vector = self
            .call(move || embedder.embed(&body).map_err(|e| e.to_string()))
            .await
            .map_err(|e| e.into_error(Stage::Embedding, PipelineError::Embedding))?;

        let expected = self.embedder.dimension();
        if vector.len() != expected {
            return Err(PipelineError::Embedding(format!(
                "expected {} dimensions, got {}",
                expected,
                vector.len()
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Embedding(
                "embedding contains non-finite values".to_string(),
            ));
        }
        if vector.iter().all(|v| *v == 0.0) {
            return Err(PipelineError::Embedding(
                "embedding has zero norm".to_string(),
            ));
        }
        Ok(vector)
    }

    async fn classify(&self, body: Arc<str>) -> Result<Classification, PipelineError> {
        let classifier = Arc::clone(&self.classifier);
        let config = Arc::clone(&self.config);
        let output = self
            .call(move || {
                classifier
                    .classify(&body, &config.taxonomy)
                    .map_err(|e| e.to_string())
            })
            .await
            .map_err(|e| e.into_error(Stage::Classification, PipelineError::Classification))?;

        match output {
            ModelOutput::Parsed(classification) => {
                normalize(classification, &self.config).map_err(|reason| {
                    PipelineError::MalformedOutput {
                        stage: Stage::Classification,
                        reason,
                    }
                })
            }
            ModelOutput::Malformed { reason, .. } => Err(PipelineError::MalformedOutput {
                stage: Stage::Classification,
                reason,
            }),
        }
    }

    async fn extract(&self, body: Arc<str>) -> Result<EntitySet, PipelineError> {
        let classifier = Arc::clone(&self.classifier);
        let output = self
            .call(move || classifier.extract_entities(&body).map_err(|e| e.to_string()))
            .await
            .map_err(|e| {
                e.into_error(Stage::EntityExtraction, |msg| {
                    PipelineError::Classification(format!("entity extraction: {}", msg))
                })
            })?;

        output
            .into_result()
            .map_err(|reason| PipelineError::MalformedOutput {
                stage: Stage::EntityExtraction,
                reason,
            })
    }

    async fn persist(
        &self,
        record: ProcessedRecord,
        entry: IndexEntry,
    ) -> Result<ProcessedRecord, PipelineError> {
        let index = Arc::clone(&self.index);
        let pending = entry.clone();
        let written = self
            .call(move || {
                let mut index = index
                    .lock()
                    .map_err(|_| "index lock poisoned".to_string())?;
                index.upsert(pending).map_err(|e| e.to_string())
            })
            .await;

        match written {
            Ok(()) => {
                info!(
                    source = %record.source,
                    id = %entry.id,
                    request_type = %record.request_type,
                    sub_request_type = %record.sub_request_type,
                    "Stored new entry"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(source = %record.source, id = %entry.id, "Index write failed: {}", e);
                Err(PipelineError::PersistenceFailed {
                    record: Box::new(record),
                    entry: Box::new(entry),
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Run a collaborator call on the blocking pool under the stage timeout
    async fn call<T, F>(&self, f: F) -> Result<T, CallError>
    where
        F: FnOnce() -> Result<T, String> + Send + 'static,
        T: Send + 'static,
    {
        let limit = self.config.stage_timeout();
        match timeout(limit, tokio::task::spawn_blocking(f)).await {
            Err(_) => Err(CallError::TimedOut(limit)),
            Ok(Err(e)) => Err(CallError::Failed(format!("task join error: {}", e))),
            Ok(Ok(result)) => result.map_err(CallError::Failed),
        }
    }
}
