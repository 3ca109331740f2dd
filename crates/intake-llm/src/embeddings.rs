//! Remote embedding services
//!
//! Both clients declare the dimension of the model they talk to. They do not
//! check the returned vectors against it; the pipeline does.

use crate::openai::bearer_client;
use crate::retry::send_with_retry;
use crate::LlmError;
use intake_domain::traits::EmbeddingService;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default embedding model (all-MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Dimension of [`DEFAULT_EMBEDDING_MODEL`]
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// Errors from embedding services
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Transport failure talking to the service
    #[error(transparent)]
    Request(#[from] LlmError),

    /// The service answered with something other than a vector
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),
}

/// Embeddings via Ollama's `/api/embeddings`
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    endpoint: String,
    model: String,
    dimension: usize,
    client: Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    /// Create a client for `{endpoint}/api/embeddings`
    pub fn new(
        endpoint: &str,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            LlmError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self {
            endpoint: format!("{}/api/embeddings", endpoint.trim_end_matches('/')),
            model: model.into(),
            dimension,
            client,
            max_retries: crate::ollama::DEFAULT_MAX_RETRIES,
        })
    }

    /// Set the maximum number of attempts per request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl EmbeddingService for OllamaEmbedder {
    type Error = EmbedError;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let response = send_with_retry(self.max_retries, &self.model, || {
            self.client.post(&self.endpoint).json(&request).send()
        })?;
        let parsed: OllamaEmbeddingResponse = response
            .json()
            .map_err(|e| EmbedError::InvalidResponse(e.to_string()))?;
        if parsed.embedding.is_empty() {
            return Err(EmbedError::InvalidResponse("empty embedding".to_string()));
        }
        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Embeddings via an OpenAI-compatible `/embeddings` endpoint
#[derive(Debug, Clone)]
pub struct OpenAiEmbedder {
    endpoint: String,
    model: String,
    dimension: usize,
    client: Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Create a client for `{base_url}/embeddings`
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbedError> {
        Ok(Self {
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            dimension,
            client: bearer_client(api_key, timeout)?,
            max_retries: crate::ollama::DEFAULT_MAX_RETRIES,
        })
    }

    /// Set the maximum number of attempts per request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl EmbeddingService for OpenAiEmbedder {
    type Error = EmbedError;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        let request = OpenAiEmbeddingRequest {
            model: &self.model,
            input: [text],
        };
        let response = send_with_retry(self.max_retries, &self.model, || {
            self.client.post(&self.endpoint).json(&request).send()
        })?;
        let parsed: OpenAiEmbeddingResponse = response
            .json()
            .map_err(|e| EmbedError::InvalidResponse(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| EmbedError::InvalidResponse("no embedding returned".to_string()))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
