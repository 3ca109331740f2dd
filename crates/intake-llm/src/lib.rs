//! Intake LLM Provider Layer
//!
//! Chat-completion providers and remote embedding services.
//!
//! # Architecture
//!
//! This crate implements the `LlmProvider` and `EmbeddingService` traits from
//! `intake-domain`. Every client is blocking: the pipeline calls them from
//! `spawn_blocking` threads and applies its own timeouts on top.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider`: Local Ollama chat API
//! - `OpenAiProvider`: OpenAI-compatible chat completions (OpenAI, Mistral)
//! - `OllamaEmbedder` / `OpenAiEmbedder`: remote embedding services
//!
//! # Examples
//!
//! ```
//! use intake_llm::MockProvider;
//! use intake_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("system", "test prompt").unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod embeddings;
pub mod ollama;
pub mod openai;
mod retry;

use intake_domain::traits::LlmProvider as LlmProviderTrait;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use embeddings::{EmbedError, OllamaEmbedder, OpenAiEmbedder};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Client could not be configured (bad key, bad URL)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

const MOCK_ERROR: &str = "ERROR";

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Responses are keyed by a prompt fragment: the first registered fragment
/// contained in the prompt wins, otherwise the default response is used.
///
/// # Examples
///
/// ```
/// use intake_llm::MockProvider;
/// use intake_domain::traits::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("sys", "any prompt").unwrap(), "Fixed response");
///
/// // Responses keyed by prompt fragment
/// let mut provider = MockProvider::default();
/// provider.add_response("Classify", r#"{"request_type": "Others"}"#);
/// provider.add_response("Extract", "{}");
/// assert_eq!(provider.generate("sys", "Extract fields").unwrap(), "{}");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, String)>>>,
    call_count: Arc<Mutex<usize>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Add a response for prompts containing `fragment`
    pub fn add_response(&mut self, fragment: impl Into<String>, response: impl Into<String>) {
        lock(&self.responses).push((fragment.into(), response.into()));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        *lock(&self.call_count)
    }

    /// Reset the call count
    pub fn reset_call_count(&self) {
        *lock(&self.call_count) = 0;
    }

    /// Configure to return an error for prompts containing `fragment`
    pub fn add_error(&mut self, fragment: impl Into<String>) {
        lock(&self.responses).push((fragment.into(), MOCK_ERROR.to_string()));
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, _system: &str, prompt: &str) -> Result<String, Self::Error> {
        *lock(&self.call_count) += 1;

        let responses = lock(&self.responses);
        let matched = responses
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()));
        if let Some((_, response)) = matched {
            if response == MOCK_ERROR {
                return Err(LlmError::Other("Mock error".to_string()));
            }
            return Ok(response.clone());
        }

        Ok(self.default_response.clone())
    }

    fn generate_json(&self, system: &str, prompt: &str) -> Result<String, Self::Error> {
        self.generate(system, prompt)
    }
}
