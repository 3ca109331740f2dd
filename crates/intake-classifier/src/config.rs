//! Configuration for the classifier

use serde::{Deserialize, Serialize};

/// Configuration for the classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Maximum characters of body text sent to the model; longer bodies are truncated
    pub max_text_length: usize,

    /// Tell the model a document may carry several requests
    pub multiple_requests: bool,
}

impl ClassifierConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_text_length == 0 {
            return Err("max_text_length must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_text_length: 50_000,
            multiple_requests: true,
        }
    }
}
