//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider client could not be built
    #[error("Provider error: {0}")]
    Provider(String),

    /// Similarity index could not be opened
    #[error("Index error: {0}")]
    Store(#[from] intake_store::StoreError),

    /// Pipeline error
    #[error(transparent)]
    Pipeline(#[from] intake_pipeline::PipelineError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Some documents were not fully processed
    #[error("{failed} of {total} document(s) failed")]
    DocumentsFailed {
        /// Documents with no record or an unsaved record
        failed: usize,
        /// Documents in the run
        total: usize,
    },
}
