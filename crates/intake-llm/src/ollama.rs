//! Ollama Provider Implementation
//!
//! Integration with Ollama's local chat API, for running models on-premise.
//!
//! # Features
//!
//! - Blocking HTTP communication with the `/api/chat` endpoint
//! - Deterministic sampling (temperature 0)
//! - JSON mode for structured output
//! - Retry logic with exponential backoff
//!
//! # Examples
//!
//! ```no_run
//! use intake_llm::OllamaProvider;
//! use intake_domain::traits::LlmProvider;
//!
//! let provider = OllamaProvider::default_endpoint("mistral").unwrap();
//! let answer = provider.generate("You are terse.", "Say hello").unwrap();
//! ```

use crate::retry::send_with_retry;
use crate::LlmError;
use intake_domain::traits::LlmProvider as LlmProviderTrait;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for LLM requests (120 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Ollama API provider for local LLM inference
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    endpoint: String,
    model: String,
    client: Client,
    max_retries: u32,
}

#[derive(Serialize)]
pub(crate) struct ChatMessage<'a> {
    pub(crate) role: &'a str,
    pub(crate) content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Deserialize)]
struct OllamaMessage {
    content: String,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Model to use (e.g., "mistral", "llama3")
    /// - `timeout`: Per-request HTTP timeout
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Create a provider against `http://localhost:11434`
    pub fn default_endpoint(model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(DEFAULT_ENDPOINT, model, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Set the maximum number of attempts per request
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.model
    }

    fn chat(&self, system: &str, prompt: &str, format: Option<&str>) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.endpoint);
        let request_body = OllamaChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: ChatOptions { temperature: 0.0 },
            format,
        };

        debug!(model = %self.model, json = format.is_some(), "Calling Ollama chat");
        let response = send_with_retry(self.max_retries, &self.model, || {
            self.client.post(&url).json(&request_body).send()
        })?;

        response
            .json::<OllamaChatResponse>()
            .map(|r| r.message.content)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

impl LlmProviderTrait for OllamaProvider {
    type Error = LlmError;

    fn generate(&self, system: &str, prompt: &str) -> Result<String, Self::Error> {
        self.chat(system, prompt, None)
    }

    fn generate_json(&self, system: &str, prompt: &str) -> Result<String, Self::Error> {
        self.chat(system, prompt, Some("json"))
    }
}
