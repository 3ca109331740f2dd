//! Process command implementation.

use crate::cli::ProcessArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::providers::{build_chat_model, build_embedder};
use intake_classifier::LlmClassifier;
use intake_domain::traits::{ClassificationService, EmbeddingService, SimilarityIndex};
use intake_ingest::FileSource;
use intake_pipeline::{BatchSummary, DocumentOutcome, Pipeline, PipelineConfig};
use intake_store::SqliteIndex;
use std::fmt::Display;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

/// Classify the given files and report one row per file.
///
/// Fails with [`CliError::DocumentsFailed`] when any file was not fully
/// processed, after printing every result.
pub async fn execute_process(
    args: ProcessArgs,
    mut config: Config,
    formatter: &Formatter,
) -> Result<()> {
    apply_overrides(&mut config.pipeline, &args);

    let embedder = build_embedder(&config.embedding, args.mock)?;
    let model = build_chat_model(&config.llm, args.mock)?;
    let classifier = LlmClassifier::new(model, config.classifier.clone());

    let index = if args.mock {
        SqliteIndex::in_memory(embedder.dimension())?
    } else {
        let path = config.index_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        info!(path = %path.display(), "Opening index");
        SqliteIndex::open(&path, embedder.dimension())?
    };

    let pipeline = Pipeline::new(embedder, classifier, index, config.pipeline)?;

    let mut source = FileSource::new();
    if let Some(dir) = args.attachments {
        source = source.with_attachment_dir(dir);
    }

    let outcomes = pipeline.process_paths(Arc::new(source), args.files).await;
    let outcomes = retry_unsaved(&pipeline, outcomes).await;

    println!("{}", formatter.format_outcomes(&outcomes)?);

    let summary = BatchSummary::from_outcomes(&outcomes);
    if summary.has_failures() {
        return Err(CliError::DocumentsFailed {
            failed: summary.failed + summary.partial,
            total: summary.total,
        });
    }
    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &ProcessArgs) {
    if let Some(threshold) = args.duplicate_threshold {
        config.duplicate_threshold = threshold;
    }
    if let Some(threshold) = args.confidence_threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrency = concurrency;
    }
}

/// Give each classified-but-unsaved document one more write attempt.
async fn retry_unsaved<E, C, I>(
    pipeline: &Pipeline<E, C, I>,
    outcomes: Vec<DocumentOutcome>,
) -> Vec<DocumentOutcome>
where
    E: EmbeddingService + Send + Sync + 'static,
    E::Error: Display,
    C: ClassificationService + Send + Sync + 'static,
    C::Error: Display,
    I: SimilarityIndex + Send + 'static,
    I::Error: Display,
{
    let mut retried = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        let DocumentOutcome { source, result } = outcome;
        let result = match result {
            Err(e) if e.is_partial_success() => match e.into_partial() {
                Ok((record, entry)) => {
                    warn!(source = %source, "Retrying unsaved entry");
                    pipeline.retry_upsert(record, entry).await
                }
                Err(e) => Err(e),
            },
            other => other,
        };
        retried.push(DocumentOutcome { source, result });
    }
    retried
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args(files: Vec<PathBuf>) -> ProcessArgs {
        ProcessArgs {
            files,
            duplicate_threshold: None,
            confidence_threshold: None,
            concurrency: Some(1),
            attachments: None,
            mock: true,
        }
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = PipelineConfig::default();
        let mut args = args(vec![]);
        args.duplicate_threshold = Some(0.9);
        args.confidence_threshold = Some(0.5);

        apply_overrides(&mut config, &args);

        assert_eq!(config.duplicate_threshold, 0.9);
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.max_concurrency, 1);
    }

    #[tokio::test]
    async fn test_mock_run_succeeds() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        fs::write(&first, "Please roll the facility on a cashless basis.").unwrap();
        fs::write(&second, "Please roll the facility\non a cashless basis.").unwrap();

        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let result = execute_process(args(vec![first, second]), Config::default(), &formatter).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_document_reported() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.txt");
        let bad = dir.path().join("bad.pptx");
        fs::write(&good, "Interest payment received.").unwrap();
        fs::write(&bad, "binary").unwrap();

        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let result = execute_process(args(vec![good, bad]), Config::default(), &formatter).await;

        assert!(matches!(
            result,
            Err(CliError::DocumentsFailed { failed: 1, total: 2 })
        ));
    }

    #[tokio::test]
    async fn test_invalid_override_rejected() {
        let mut args = args(vec![PathBuf::from("a.txt")]);
        args.duplicate_threshold = Some(3.0);

        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let result = execute_process(args, Config::default(), &formatter).await;

        assert!(matches!(result, Err(CliError::Pipeline(_))));
    }
}
