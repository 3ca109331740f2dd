//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use intake_classifier::ClassifierConfig;
use intake_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration, stored as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Language model used for classification and entity extraction
    #[serde(default)]
    pub llm: LlmSettings,

    /// Embedding model used for duplicate detection
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Similarity index location
    #[serde(default)]
    pub index: IndexSettings,

    /// Prompt settings
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Thresholds, concurrency and taxonomy
    ///
    /// Last so the nested taxonomy table serialises after plain values.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

/// Chat model backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions API (OpenAI, Mistral, ...)
    OpenAi,
}

/// Embedding backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI-compatible embeddings API
    OpenAi,
    /// Hash-based offline embeddings
    Mock,
}

/// Language model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Backend
    pub provider: LlmProviderKind,

    /// Base URL; the provider's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Attempts per request for retryable failures
    pub max_retries: u32,

    /// HTTP timeout per request (seconds)
    pub timeout_secs: u64,
}

/// Embedding model settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Backend
    pub provider: EmbeddingProviderKind,

    /// Base URL; the provider's default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model name
    pub model: String,

    /// Vector length the model produces
    pub dimension: usize,

    /// Environment variable holding the API key
    pub api_key_env: String,
}

/// Similarity index settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    /// SQLite database file; `~/.intake/index.db` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Config {
    /// Directory holding the config file and the default index.
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".intake"))
    }

    /// Get the default configuration file path.
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from `path`, or the defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Check every section.
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate().map_err(CliError::Config)?;
        self.classifier.validate().map_err(CliError::Config)?;
        if self.embedding.dimension == 0 {
            return Err(CliError::Config(
                "embedding.dimension must be greater than 0".into(),
            ));
        }
        if self.llm.max_retries == 0 {
            return Err(CliError::Config("llm.max_retries must be greater than 0".into()));
        }
        Ok(())
    }

    /// Index path, falling back to `~/.intake/index.db`.
    pub fn index_path(&self) -> Result<PathBuf> {
        match &self.index.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::home_dir()?.join("index.db")),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProviderKind::Ollama,
            endpoint: None,
            model: "mistral".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_retries: intake_llm::ollama::DEFAULT_MAX_RETRIES,
            timeout_secs: intake_llm::ollama::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::Ollama,
            endpoint: None,
            model: intake_llm::embeddings::DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: intake_llm::embeddings::DEFAULT_EMBEDDING_DIMENSION,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}
