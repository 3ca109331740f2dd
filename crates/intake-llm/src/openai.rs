//! OpenAI-compatible chat completions
//!
//! Talks to any server implementing `POST /chat/completions` with bearer
//! authentication. Mistral's hosted API is one such server.

use crate::ollama::ChatMessage;
use crate::retry::send_with_retry;
use crate::LlmError;
use intake_domain::traits::LlmProvider as LlmProviderTrait;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// OpenAI API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Mistral API base URL
pub const MISTRAL_BASE_URL: &str = "https://api.mistral.ai/v1";

/// Default chat model on the Mistral API
pub const DEFAULT_MISTRAL_MODEL: &str = "mistral-small";

/// Chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    endpoint: String,
    model: String,
    client: Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Build a blocking client carrying the bearer token
pub(crate) fn bearer_client(api_key: &str, timeout: Duration) -> Result<Client, LlmError> {
    if api_key.trim().is_empty() {
        return Err(LlmError::Configuration("missing API key".to_string()));
    }
    let mut headers = HeaderMap::new();
    let auth = format!("Bearer {}", api_key.trim());
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&auth)
            .map_err(|_| LlmError::Configuration("invalid API key".to_string()))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))
}

impl OpenAiProvider {
    /// Create a client for `{base_url}/chat/completions`
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(LlmError::Configuration("missing model name".to_string()));
        }
        Ok(Self {
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model,
            client: bearer_client(api_key, timeout)?,
            max_retries: crate::ollama::DEFAULT_MAX_RETRIES,
        })
    }

    /// Client for Mistral's hosted `mistral-small`
    pub fn mistral(api_key: &str, timeout: Duration) -> Result<Self, LlmError> {
        Self::new(MISTRAL_BASE_URL, api_key, DEFAULT_MISTRAL_MODEL, timeout)
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

    fn complete(&self, system: &str, prompt: &str, json: bool) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            temperature: 0.0,
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
            response_format: json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        debug!(model = %self.model, json, "Calling chat completions");
        let response = send_with_retry(self.max_retries, &self.model, || {
            self.client.post(&self.endpoint).json(&body).send()
        })?;

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))
    }
}

impl LlmProviderTrait for OpenAiProvider {
    type Error = LlmError;

    fn generate(&self, system: &str, prompt: &str) -> Result<String, Self::Error> {
        self.complete(system, prompt, false)
    }

    fn generate_json(&self, system: &str, prompt: &str) -> Result<String, Self::Error> {
        self.complete(system, prompt, true)
    }
}
