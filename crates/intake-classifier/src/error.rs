//! Error types for the classifier

use thiserror::Error;

/// Errors that can occur while classifying
///
/// Unparseable model output is not an error; it is reported as
/// `ModelOutput::Malformed`.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
