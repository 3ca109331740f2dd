//! Configuration for the pipeline

use intake_domain::Taxonomy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the pipeline
///
/// Read-only once the pipeline is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Similarity strictly above which a document is a duplicate
    pub duplicate_threshold: f64,

    /// Classifications below this confidence become ("Others", "Unknown")
    pub confidence_threshold: f64,

    /// Neighbours requested per query; only the nearest one is considered
    pub top_k: usize,

    /// Maximum time for a single collaborator call (seconds)
    pub stage_timeout_secs: u64,

    /// Documents processed at once by batch operations
    pub max_concurrency: usize,

    /// Replace pairs outside the taxonomy with ("Others", "Unknown")
    pub enforce_taxonomy: bool,

    /// Permitted request types and sub-types
    pub taxonomy: Taxonomy,
}

impl PipelineConfig {
    /// Get the stage timeout as a Duration
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err("duplicate_threshold must be between 0.0 and 1.0".to_string());
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err("confidence_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.top_k == 0 {
            return Err("top_k must be greater than 0".to_string());
        }
        if self.stage_timeout_secs == 0 {
            return Err("stage_timeout_secs must be greater than 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        if self.taxonomy.is_empty() {
            return Err("taxonomy must contain at least one request type".to_string());
        }
        Ok(())
    }

    /// Strict preset: only near-identical texts count as duplicates, and
    /// one document at a time so concurrent near-duplicates cannot both be stored
    pub fn strict() -> Self {
        Self {
            duplicate_threshold: 0.95,
            max_concurrency: 1,
            ..Self::default()
        }
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

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.85,
            confidence_threshold: 0.85,
            top_k: 1,
            stage_timeout_secs: 120,
            max_concurrency: 4,
            enforce_taxonomy: true,
            taxonomy: Taxonomy::commercial_lending(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.duplicate_threshold, 0.85);
        assert_eq!(config.confidence_threshold, 0.85);
        assert_eq!(config.top_k, 1);
        assert_eq!(config.stage_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_strict_config_is_valid() {
        let config = PipelineConfig::strict();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrency, 1);
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = PipelineConfig {
            duplicate_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            confidence_threshold: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_counts() {
        for config in [
            PipelineConfig { top_k: 0, ..Default::default() },
            PipelineConfig { stage_timeout_secs: 0, ..Default::default() },
            PipelineConfig { max_concurrency: 0, ..Default::default() },
            PipelineConfig { taxonomy: Taxonomy::new(), ..Default::default() },
        ] {
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_toml_custom_taxonomy() {
        let parsed = PipelineConfig::from_toml(
            r#"
            duplicate_threshold = 0.9

            [taxonomy]
            "Fee Payment" = ["Ongoing Fee"]
            "#,
        )
        .unwrap();

        assert_eq!(parsed.duplicate_threshold, 0.9);
        assert_eq!(parsed.confidence_threshold, 0.85);
        assert!(parsed.taxonomy.contains("Fee Payment", "Ongoing Fee"));
        assert!(!parsed.taxonomy.has_request_type("Closing Notice"));
    }
}
