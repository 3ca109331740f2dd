//! Integration tests for the pipeline
//!
//! The collaborators are counting fakes so each test can check how many
//! embedding, classification and index calls a document caused.

use intake_domain::traits::{
    ClassificationService, DocumentSource, EmbeddingService, SimilarityIndex,
};
use intake_domain::{
    Classification, Document, EntitySet, EntryId, EntryMetadata, IndexEntry, ModelOutput, Neighbor,
    Taxonomy,
};
use intake_pipeline::{BatchSummary, Pipeline, PipelineConfig, PipelineError, Stage};
use intake_store::embedding::MockEmbeddingModel;
use intake_store::SqliteIndex;
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Counters {
    embed: AtomicUsize,
    classify: AtomicUsize,
    extract: AtomicUsize,
    query: AtomicUsize,
    upsert: AtomicUsize,
}

impl Counters {
    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Maps known texts to fixed vectors; anything else embeds to `[0, 0, 1]`
struct FakeEmbedder {
    vectors: HashMap<String, Vec<f32>>,
    counters: Arc<Counters>,
    fail: bool,
    delay: Option<Duration>,
}

impl FakeEmbedder {
    fn new(counters: Arc<Counters>) -> Self {
        Self {
            vectors: HashMap::new(),
            counters,
            fail: false,
            delay: None,
        }
    }

    fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }
}

impl EmbeddingService for FakeEmbedder {
    type Error = String;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        self.counters.embed.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            return Err("embedding service unavailable".to_string());
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, 1.0]))
    }

    fn dimension(&self) -> usize {
        3
    }
}

struct FakeClassifier {
    classification: ModelOutput<Classification>,
    entities: ModelOutput<EntitySet>,
    counters: Arc<Counters>,
    fail: bool,
    seen_taxonomy: Arc<Mutex<Option<Taxonomy>>>,
}

impl FakeClassifier {
    fn new(counters: Arc<Counters>, classification: Classification) -> Self {
        Self {
            classification: ModelOutput::Parsed(classification),
            entities: ModelOutput::Parsed(EntitySet::from_value(
                json!({"amount": "$5,000,000", "deal_name": "ABC Bank"}),
            )),
            counters,
            fail: false,
            seen_taxonomy: Arc::new(Mutex::new(None)),
        }
    }
}

impl ClassificationService for FakeClassifier {
    type Error = String;

    fn classify(
        &self,
        _text: &str,
        taxonomy: &Taxonomy,
    ) -> Result<ModelOutput<Classification>, Self::Error> {
        self.counters.classify.fetch_add(1, Ordering::SeqCst);
        *self.seen_taxonomy.lock().unwrap() = Some(taxonomy.clone());
        if self.fail {
            return Err("model offline".to_string());
        }
        Ok(self.classification.clone())
    }

    fn extract_entities(&self, _text: &str) -> Result<ModelOutput<EntitySet>, Self::Error> {
        self.counters.extract.fetch_add(1, Ordering::SeqCst);
        Ok(self.entities.clone())
    }
}

/// Brute-force cosine index over a shared vector of entries
struct FakeIndex {
    entries: Arc<Mutex<Vec<IndexEntry>>>,
    counters: Arc<Counters>,
    fail_query: bool,
    fail_upserts: Arc<AtomicUsize>,
    /// Report this score for every hit instead of the computed cosine
    fixed_score: Option<f32>,
    /// Keep the entry but report the write as failed, as a timed-out write does
    store_then_fail: bool,
}

impl FakeIndex {
    fn new(counters: Arc<Counters>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            counters,
            fail_query: false,
            fail_upserts: Arc::new(AtomicUsize::new(0)),
            fixed_score: None,
            store_then_fail: false,
        }
    }

    fn seeded(counters: Arc<Counters>, entries: Vec<IndexEntry>) -> Self {
        let index = Self::new(counters);
        *index.entries.lock().unwrap() = entries;
        index
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    dot / (na * nb)
}

impl SimilarityIndex for FakeIndex {
    type Error = String;

    fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<Neighbor>, Self::Error> {
        self.counters.query.fetch_add(1, Ordering::SeqCst);
        if self.fail_query {
            return Err("index unreachable".to_string());
        }
        let mut hits: Vec<Neighbor> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| Neighbor {
                id: e.id,
                score: self.fixed_score.unwrap_or_else(|| cosine(vector, &e.vector)),
                metadata: e.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(top_k);
        Ok(hits)
    }

    fn upsert(&mut self, entry: IndexEntry) -> Result<(), Self::Error> {
        self.counters.upsert.fetch_add(1, Ordering::SeqCst);
        let remaining = self.fail_upserts.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_upserts.store(remaining - 1, Ordering::SeqCst);
            return Err("database is locked".to_string());
        }
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| e.id == entry.id) {
            return Err(format!("duplicate id {}", entry.id));
        }
        entries.push(entry);
        if self.store_then_fail {
            return Err("write timed out".to_string());
        }
        Ok(())
    }

    fn contains(&self, id: EntryId) -> Result<bool, Self::Error> {
        Ok(self.entries.lock().unwrap().iter().any(|e| e.id == id))
    }

    fn len(&self) -> Result<usize, Self::Error> {
        Ok(self.entries.lock().unwrap().len())
    }
}

const FEE_EMAIL: &str = "Please process the ongoing fee of $12,500 for ABC Bank.";
const FEE_EMAIL_AGAIN: &str = "Please process the ongoing fee of $12,500 for ABC Bank!";
const CLOSING_EMAIL: &str = "Notice of commitment decrease on the term loan facility.";

fn stored_fee_entry() -> IndexEntry {
    IndexEntry::new(
        vec![1.0, 0.0, 0.0],
        EntryMetadata {
            body: FEE_EMAIL.to_string(),
            classification: Classification::new("Fee Payment", "Ongoing Fee", 0.92),
            entities: EntitySet::from_value(json!({"amount": "$12,500"})),
        },
    )
}

fn fee_classification() -> Classification {
    Classification::new("Fee Payment", "Ongoing Fee", 0.93)
}

fn config() -> PipelineConfig {
    PipelineConfig {
        stage_timeout_secs: 5,
        ..PipelineConfig::default()
    }
}

#[tokio::test]
async fn test_new_document_is_classified_and_stored() {
    let counters = Arc::new(Counters::default());
    let index = FakeIndex::new(Arc::clone(&counters));
    let entries = Arc::clone(&index.entries);
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)).with(FEE_EMAIL, vec![1.0, 0.0, 0.0]),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        index,
        config(),
    )
    .unwrap();

    let record = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap();

    assert!(!record.is_duplicate);
    assert_eq!(record.source, "fee.eml");
    assert_eq!(record.request_type, "Fee Payment");
    assert_eq!(record.sub_request_type, "Ongoing Fee");
    assert_eq!(record.confidence_score, 0.93);
    assert_eq!(record.entities.get("deal_name"), Some(&json!("ABC Bank")));
    assert!(record.duplicate_of.is_none());

    assert_eq!(Counters::get(&counters.embed), 1);
    assert_eq!(Counters::get(&counters.classify), 1);
    assert_eq!(Counters::get(&counters.extract), 1);
    assert_eq!(Counters::get(&counters.upsert), 1);

    let stored = entries.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].metadata.body, FEE_EMAIL);
    assert_eq!(stored[0].vector, vec![1.0, 0.0, 0.0]);
    assert_eq!(stored[0].metadata.classification, fee_classification());
}

#[tokio::test]
async fn test_duplicate_reuses_stored_classification() {
    let counters = Arc::new(Counters::default());
    let stored = stored_fee_entry();
    let stored_id = stored.id;
    let index = FakeIndex::seeded(Arc::clone(&counters), vec![stored]);
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)).with(FEE_EMAIL_AGAIN, vec![0.99, 0.1, 0.0]),
        FakeClassifier::new(
            Arc::clone(&counters),
            Classification::new("Closing Notice", "Decrease", 0.99),
        ),
        index,
        config(),
    )
    .unwrap();

    let record = pipeline
        .process(Document::new("again.eml", FEE_EMAIL_AGAIN))
        .await
        .unwrap();

    assert!(record.is_duplicate);
    assert_eq!(record.source, "again.eml");
    assert_eq!(record.request_type, "Fee Payment");
    assert_eq!(record.sub_request_type, "Ongoing Fee");
    assert_eq!(record.confidence_score, 0.92);
    assert_eq!(record.entities.get("amount"), Some(&json!("$12,500")));
    assert_eq!(record.duplicate_of, Some(stored_id));

    assert_eq!(Counters::get(&counters.embed), 1);
    assert_eq!(Counters::get(&counters.classify), 0);
    assert_eq!(Counters::get(&counters.extract), 0);
    assert_eq!(Counters::get(&counters.upsert), 0);
    assert_eq!(pipeline.index_len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_score_equal_to_threshold_is_not_duplicate() {
    let counters = Arc::new(Counters::default());
    let index = FakeIndex::seeded(Arc::clone(&counters), vec![stored_fee_entry()]);
    let pipeline = Pipeline::new(
        // cosine([1, 0, 0], [3, 4, 0]) == 0.6
        FakeEmbedder::new(Arc::clone(&counters)).with(CLOSING_EMAIL, vec![3.0, 4.0, 0.0]),
        FakeClassifier::new(
            Arc::clone(&counters),
            Classification::new("Closing Notice", "Decrease", 0.9),
        ),
        index,
        PipelineConfig {
            duplicate_threshold: f64::from(0.6f32),
            ..config()
        },
    )
    .unwrap();

    let record = pipeline
        .process(Document::new("close.eml", CLOSING_EMAIL))
        .await
        .unwrap();

    assert!(!record.is_duplicate);
    assert_eq!(record.request_type, "Closing Notice");
    assert_eq!(Counters::get(&counters.classify), 1);
    assert_eq!(pipeline.index_len().await.unwrap(), 2);
}

fn pipeline_with_fixed_score(
    counters: &Arc<Counters>,
    score: f32,
) -> Pipeline<FakeEmbedder, FakeClassifier, FakeIndex> {
    let mut index = FakeIndex::seeded(Arc::clone(counters), vec![stored_fee_entry()]);
    index.fixed_score = Some(score);
    Pipeline::new(
        FakeEmbedder::new(Arc::clone(counters)),
        FakeClassifier::new(
            Arc::clone(counters),
            Classification::new("Closing Notice", "Decrease", 0.9),
        ),
        index,
        config(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_score_equal_to_default_threshold_is_not_duplicate() {
    let counters = Arc::new(Counters::default());
    let pipeline = pipeline_with_fixed_score(&counters, 0.85);
    assert_eq!(pipeline.config().duplicate_threshold, 0.85);

    let record = pipeline
        .process(Document::new("close.eml", CLOSING_EMAIL))
        .await
        .unwrap();

    assert!(!record.is_duplicate);
    assert_eq!(record.request_type, "Closing Notice");
    assert_eq!(Counters::get(&counters.classify), 1);
    assert_eq!(pipeline.index_len().await.unwrap(), 2);
}

#[tokio::test]
async fn test_score_just_above_default_threshold_is_duplicate() {
    let counters = Arc::new(Counters::default());
    let pipeline = pipeline_with_fixed_score(&counters, 0.85f32.next_up());

    let record = pipeline
        .process(Document::new("close.eml", CLOSING_EMAIL))
        .await
        .unwrap();

    assert!(record.is_duplicate);
    assert_eq!(record.request_type, "Fee Payment");
    assert_eq!(Counters::get(&counters.classify), 0);
    assert_eq!(pipeline.index_len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_low_confidence_becomes_fallback() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(
            Arc::clone(&counters),
            Classification::new("Closing Notice", "Decrease", 0.4),
        ),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let record = pipeline
        .process(Document::new("vague.txt", "hello, any update?"))
        .await
        .unwrap();

    assert_eq!(record.request_type, "Others");
    assert_eq!(record.sub_request_type, "Unknown");
    assert_eq!(record.confidence_score, 0.4);
    assert!(!record.is_duplicate);
}

#[tokio::test]
async fn test_pair_outside_taxonomy_becomes_fallback() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(
            Arc::clone(&counters),
            Classification::new("Loan Transfer", "Assignment", 0.97),
        ),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let record = pipeline
        .process(Document::new("transfer.eml", "Assignment of the loan to XYZ"))
        .await
        .unwrap();

    assert_eq!(record.request_type, "Others");
    assert_eq!(record.sub_request_type, "Unknown");
    assert_eq!(record.confidence_score, 0.97);
}

#[tokio::test]
async fn test_classifier_receives_configured_taxonomy() {
    let counters = Arc::new(Counters::default());
    let taxonomy = Taxonomy::new().with_type("Fee Payment", ["Ongoing Fee", "Letter of Credit Fee"]);
    let classifier = FakeClassifier::new(Arc::clone(&counters), fee_classification());
    let seen = Arc::clone(&classifier.seen_taxonomy);
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        classifier,
        FakeIndex::new(Arc::clone(&counters)),
        PipelineConfig {
            taxonomy: taxonomy.clone(),
            ..config()
        },
    )
    .unwrap();

    pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap();

    assert_eq!(seen.lock().unwrap().as_ref(), Some(&taxonomy));
    assert_eq!(pipeline.taxonomy(), &taxonomy);
}

#[tokio::test]
async fn test_blank_document_rejected_before_embedding() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("empty.eml", "  \n\t "))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Extraction));
    assert_eq!(Counters::get(&counters.embed), 0);
}

#[tokio::test]
async fn test_embedding_failure_stops_pipeline() {
    let counters = Arc::new(Counters::default());
    let mut embedder = FakeEmbedder::new(Arc::clone(&counters));
    embedder.fail = true;
    let pipeline = Pipeline::new(
        embedder,
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Embedding(_)));
    assert_eq!(Counters::get(&counters.query), 0);
    assert_eq!(Counters::get(&counters.classify), 0);
}

#[tokio::test]
async fn test_wrong_dimension_rejected() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)).with(FEE_EMAIL, vec![1.0, 0.0]),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Embedding(_)));
    assert!(err.to_string().contains("expected 3 dimensions"));
    assert_eq!(Counters::get(&counters.query), 0);
}

#[tokio::test]
async fn test_index_query_failure_is_not_treated_as_new() {
    let counters = Arc::new(Counters::default());
    let mut index = FakeIndex::new(Arc::clone(&counters));
    index.fail_query = true;
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        index,
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::IndexQuery(_)));
    assert_eq!(Counters::get(&counters.classify), 0);
    assert_eq!(Counters::get(&counters.upsert), 0);
}

#[tokio::test]
async fn test_classification_failure_reported() {
    let counters = Arc::new(Counters::default());
    let mut classifier = FakeClassifier::new(Arc::clone(&counters), fee_classification());
    classifier.fail = true;
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        classifier,
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Classification(_)));
    assert_eq!(Counters::get(&counters.upsert), 0);
    assert_eq!(pipeline.index_len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_classification_output() {
    let counters = Arc::new(Counters::default());
    let mut classifier = FakeClassifier::new(Arc::clone(&counters), fee_classification());
    classifier.classification = ModelOutput::malformed("I think it's a fee", "Expected JSON");
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        classifier,
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    match err {
        PipelineError::MalformedOutput { stage, reason } => {
            assert_eq!(stage, Stage::Classification);
            assert_eq!(reason, "Expected JSON");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(Counters::get(&counters.upsert), 0);
}

#[tokio::test]
async fn test_out_of_range_confidence_is_malformed() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(
            Arc::clone(&counters),
            Classification::new("Fee Payment", "Ongoing Fee", 1.7),
        ),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Classification));
    assert!(matches!(err, PipelineError::MalformedOutput { .. }));
}

#[tokio::test]
async fn test_malformed_entity_output() {
    let counters = Arc::new(Counters::default());
    let mut classifier = FakeClassifier::new(Arc::clone(&counters), fee_classification());
    classifier.entities = ModelOutput::malformed("amount: lots", "Expected a JSON object");
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        classifier,
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::EntityExtraction));
    assert_eq!(Counters::get(&counters.upsert), 0);
}

#[tokio::test]
async fn test_stage_timeout() {
    let counters = Arc::new(Counters::default());
    let mut embedder = FakeEmbedder::new(Arc::clone(&counters));
    embedder.delay = Some(Duration::from_millis(2500));
    let pipeline = Pipeline::new(
        embedder,
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        PipelineConfig {
            stage_timeout_secs: 1,
            ..config()
        },
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("slow.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Timeout {
            stage: Stage::Embedding
        }
    ));
    assert_eq!(Counters::get(&counters.query), 0);
}

#[tokio::test]
async fn test_persistence_failure_keeps_record_and_retry_succeeds() {
    let counters = Arc::new(Counters::default());
    let index = FakeIndex::new(Arc::clone(&counters));
    index.fail_upserts.store(1, Ordering::SeqCst);
    let entries = Arc::clone(&index.entries);
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        index,
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert!(err.is_partial_success());
    assert_eq!(err.stage(), Some(Stage::Persistence));
    assert_eq!(err.partial_record().unwrap().request_type, "Fee Payment");
    assert!(entries.lock().unwrap().is_empty());

    let (record, entry) = err.into_partial().unwrap();
    let retried = pipeline.retry_upsert(record, entry).await.unwrap();

    assert_eq!(retried.source, "fee.eml");
    assert_eq!(entries.lock().unwrap().len(), 1);
    assert_eq!(Counters::get(&counters.classify), 1);
    assert_eq!(Counters::get(&counters.upsert), 2);
}

#[tokio::test]
async fn test_retry_after_write_that_landed_succeeds() {
    let counters = Arc::new(Counters::default());
    let mut index = FakeIndex::new(Arc::clone(&counters));
    index.store_then_fail = true;
    let entries = Arc::clone(&index.entries);
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        index,
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();
    assert!(err.is_partial_success());
    assert_eq!(entries.lock().unwrap().len(), 1);

    let (record, entry) = err.into_partial().unwrap();
    let retried = pipeline.retry_upsert(record, entry).await.unwrap();

    assert_eq!(retried.source, "fee.eml");
    assert_eq!(retried.request_type, "Fee Payment");
    assert_eq!(entries.lock().unwrap().len(), 1);
    assert_eq!(Counters::get(&counters.upsert), 1);
}

#[tokio::test]
async fn test_zero_embedding_rejected() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)).with(FEE_EMAIL, vec![0.0, 0.0, 0.0]),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let err = pipeline
        .process(Document::new("fee.eml", FEE_EMAIL))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Embedding(_)));
    assert!(err.to_string().contains("zero norm"));
    assert_eq!(Counters::get(&counters.query), 0);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let counters = Arc::new(Counters::default());
    let result = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        PipelineConfig {
            max_concurrency: 0,
            ..config()
        },
    );

    assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[tokio::test]
async fn test_batch_preserves_order_and_isolates_failures() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters))
            .with(FEE_EMAIL, vec![1.0, 0.0, 0.0])
            .with(CLOSING_EMAIL, vec![0.0, 1.0, 0.0]),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        PipelineConfig {
            max_concurrency: 1,
            ..config()
        },
    )
    .unwrap();

    let outcomes = pipeline
        .process_batch(vec![
            Document::new("1.eml", FEE_EMAIL),
            Document::new("2.eml", ""),
            Document::new("3.eml", FEE_EMAIL),
            Document::new("4.eml", CLOSING_EMAIL),
        ])
        .await;

    let sources: Vec<&str> = outcomes.iter().map(|o| o.source.as_str()).collect();
    assert_eq!(sources, vec!["1.eml", "2.eml", "3.eml", "4.eml"]);

    assert!(!outcomes[0].record().unwrap().is_duplicate);
    assert!(!outcomes[1].is_success());
    assert!(outcomes[2].record().unwrap().is_duplicate);
    assert!(!outcomes[3].record().unwrap().is_duplicate);

    let summary = BatchSummary::from_outcomes(&outcomes);
    assert_eq!(
        summary,
        BatchSummary {
            total: 4,
            new_entries: 2,
            duplicates: 1,
            partial: 0,
            failed: 1,
        }
    );
    assert_eq!(Counters::get(&counters.embed), 3);
}

struct FakeSource;

impl DocumentSource for FakeSource {
    type Error = String;

    fn extract_body(&self, path: &Path) -> Result<Document, Self::Error> {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("fee.eml") => Ok(Document::new(path.display().to_string(), FEE_EMAIL)),
            _ => Err(format!("{}: unsupported format", path.display())),
        }
    }
}

#[tokio::test]
async fn test_process_paths_reports_read_failures() {
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        FakeEmbedder::new(Arc::clone(&counters)),
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        FakeIndex::new(Arc::clone(&counters)),
        config(),
    )
    .unwrap();

    let outcomes = pipeline
        .process_paths(
            Arc::new(FakeSource),
            vec![PathBuf::from("in/fee.eml"), PathBuf::from("in/sheet.xlsx")],
        )
        .await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].record().unwrap().request_type, "Fee Payment");
    match &outcomes[1].result {
        Err(PipelineError::Extraction(msg)) => assert!(msg.contains("unsupported format")),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_end_to_end_with_sqlite_index() {
    let embedder = MockEmbeddingModel::new(64);
    let dimension = embedder.dimension();
    let index = SqliteIndex::in_memory(dimension).unwrap();
    let counters = Arc::new(Counters::default());
    let pipeline = Pipeline::new(
        embedder,
        FakeClassifier::new(Arc::clone(&counters), fee_classification()),
        index,
        config(),
    )
    .unwrap();

    let first = pipeline
        .process(Document::new("a.eml", FEE_EMAIL))
        .await
        .unwrap();
    let second = pipeline
        .process(Document::new("b.eml", format!("  {}\n", FEE_EMAIL)))
        .await
        .unwrap();

    assert!(!first.is_duplicate);
    assert!(second.is_duplicate);
    assert_eq!(second.request_type, first.request_type);
    assert_eq!(second.entities, first.entities);
    assert_eq!(Counters::get(&counters.classify), 1);
    assert_eq!(pipeline.index_len().await.unwrap(), 1);
}
