//! Runtime selection of embedding and chat model backends.

use crate::config::{EmbeddingProviderKind, EmbeddingSettings, LlmProviderKind, LlmSettings};
use crate::error::{CliError, Result};
use intake_domain::traits::{EmbeddingService, LlmProvider};
use intake_llm::ollama::DEFAULT_ENDPOINT;
use intake_llm::openai::OPENAI_BASE_URL;
use intake_llm::{LlmError, MockProvider, OllamaEmbedder, OllamaProvider, OpenAiEmbedder, OpenAiProvider};
use intake_store::embedding::MockEmbeddingModel;
use std::time::Duration;
use tracing::debug;

const MOCK_CLASSIFICATION: &str =
    r#"{"request_type": "Others", "sub_request_type": "Unknown", "confidence_score": 1.0}"#;

/// Embedding backend chosen from configuration.
pub enum Embedder {
    /// Ollama `/api/embeddings`
    Ollama(OllamaEmbedder),
    /// OpenAI-compatible `/embeddings`
    OpenAi(OpenAiEmbedder),
    /// Offline hash-based vectors
    Mock(MockEmbeddingModel),
}

impl EmbeddingService for Embedder {
    type Error = String;

    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, Self::Error> {
        match self {
            Embedder::Ollama(e) => e.embed(text).map_err(|e| e.to_string()),
            Embedder::OpenAi(e) => e.embed(text).map_err(|e| e.to_string()),
            Embedder::Mock(e) => e.embed(text).map_err(|e| e.to_string()),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Embedder::Ollama(e) => e.dimension(),
            Embedder::OpenAi(e) => e.dimension(),
            Embedder::Mock(e) => e.dimension(),
        }
    }
}

/// Chat model backend chosen from configuration.
pub enum ChatModel {
    /// Ollama `/api/chat`
    Ollama(OllamaProvider),
    /// OpenAI-compatible `/chat/completions`
    OpenAi(OpenAiProvider),
    /// Canned responses
    Mock(MockProvider),
}

impl LlmProvider for ChatModel {
    type Error = LlmError;

    fn generate(&self, system: &str, prompt: &str) -> std::result::Result<String, Self::Error> {
        match self {
            ChatModel::Ollama(p) => p.generate(system, prompt),
            ChatModel::OpenAi(p) => p.generate(system, prompt),
            ChatModel::Mock(p) => p.generate(system, prompt),
        }
    }

    fn generate_json(&self, system: &str, prompt: &str) -> std::result::Result<String, Self::Error> {
        match self {
            ChatModel::Ollama(p) => p.generate_json(system, prompt),
            ChatModel::OpenAi(p) => p.generate_json(system, prompt),
            ChatModel::Mock(p) => p.generate_json(system, prompt),
        }
    }
}

/// Build the embedding backend; `mock` overrides the configured provider.
pub fn build_embedder(settings: &EmbeddingSettings, mock: bool) -> Result<Embedder> {
    let timeout = Duration::from_secs(intake_llm::ollama::DEFAULT_TIMEOUT_SECS);
    let provider = if mock {
        EmbeddingProviderKind::Mock
    } else {
        settings.provider
    };
    debug!(?provider, model = %settings.model, "Building embedder");

    let embedder = match provider {
        EmbeddingProviderKind::Mock => Embedder::Mock(MockEmbeddingModel::new(settings.dimension)),
        EmbeddingProviderKind::Ollama => Embedder::Ollama(
            OllamaEmbedder::new(
                settings.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT),
                settings.model.clone(),
                settings.dimension,
                timeout,
            )
            .map_err(|e| CliError::Provider(e.to_string()))?,
        ),
        EmbeddingProviderKind::OpenAi => Embedder::OpenAi(
            OpenAiEmbedder::new(
                settings.endpoint.as_deref().unwrap_or(OPENAI_BASE_URL),
                &api_key(&settings.api_key_env)?,
                settings.model.clone(),
                settings.dimension,
                timeout,
            )
            .map_err(|e| CliError::Provider(e.to_string()))?,
        ),
    };
    Ok(embedder)
}

/// Build the chat model backend; `mock` overrides the configured provider.
pub fn build_chat_model(settings: &LlmSettings, mock: bool) -> Result<ChatModel> {
    if mock {
        return Ok(ChatModel::Mock(mock_chat_model()));
    }

    let timeout = Duration::from_secs(settings.timeout_secs);
    debug!(provider = ?settings.provider, model = %settings.model, "Building chat model");

    let model = match settings.provider {
        LlmProviderKind::Ollama => ChatModel::Ollama(
            OllamaProvider::new(
                settings.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT),
                settings.model.clone(),
                timeout,
            )
            .map_err(|e| CliError::Provider(e.to_string()))?
            .with_max_retries(settings.max_retries),
        ),
        LlmProviderKind::OpenAi => ChatModel::OpenAi(
            OpenAiProvider::new(
                settings.endpoint.as_deref().unwrap_or(OPENAI_BASE_URL),
                &api_key(&settings.api_key_env)?,
                settings.model.clone(),
                timeout,
            )
            .map_err(|e| CliError::Provider(e.to_string()))?
            .with_max_retries(settings.max_retries),
        ),
    };
    Ok(model)
}

/// Offline model: every document is ("Others", "Unknown") with no fields.
pub fn mock_chat_model() -> MockProvider {
    let mut provider = MockProvider::new("{}");
    provider.add_response("Classify the following email", MOCK_CLASSIFICATION);
    provider
}

fn api_key(var: &str) -> Result<String> {
    std::env::var(var)
        .map_err(|_| CliError::Config(format!("Environment variable {} is not set", var)))
}
