//! Core classifier implementation

use crate::config::ClassifierConfig;
use crate::error::ClassifierError;
use crate::parser::{parse_classification, parse_entities};
use crate::prompt::{
    ClassificationPrompt, EntityPrompt, CLASSIFICATION_SYSTEM_PROMPT, ENTITY_SYSTEM_PROMPT,
};
use intake_domain::traits::{ClassificationService, LlmProvider};
use intake_domain::{Classification, EntitySet, ModelOutput, Taxonomy};
use std::fmt::Display;
use tracing::{debug, warn};

/// Classification and entity extraction backed by an LLM provider
pub struct LlmClassifier<L> {
    llm: L,
    config: ClassifierConfig,
}

impl<L> LlmClassifier<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    /// Create a new classifier
    pub fn new(llm: L, config: ClassifierConfig) -> Self {
        Self { llm, config }
    }

    /// The underlying provider
    pub fn llm(&self) -> &L {
        &self.llm
    }

    /// Current configuration
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    fn truncate<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.config.max_text_length) {
            Some((byte_idx, _)) => {
                warn!(
                    "Text exceeds {} characters, truncating before prompting",
                    self.config.max_text_length
                );
                &text[..byte_idx]
            }
            None => text,
        }
    }

    fn call_llm(&self, system: &str, prompt: &str) -> Result<String, ClassifierError> {
        debug!("Prompt length: {} chars", prompt.len());
        let response = self
            .llm
            .generate_json(system, prompt)
            .map_err(|e| ClassifierError::Llm(e.to_string()))?;
        debug!("LLM response length: {} chars", response.len());
        Ok(response)
    }
}

impl<L> ClassificationService for LlmClassifier<L>
where
    L: LlmProvider,
    L::Error: Display,
{
    type Error = ClassifierError;

    fn classify(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
    ) -> Result<ModelOutput<Classification>, Self::Error> {
        let prompt = ClassificationPrompt::new(self.truncate(text), taxonomy)
            .with_multiple_requests(self.config.multiple_requests)
            .build();

        let response = self.call_llm(CLASSIFICATION_SYSTEM_PROMPT, &prompt)?;
        let output = parse_classification(&response);
        if let ModelOutput::Malformed { reason, .. } = &output {
            warn!("Malformed classification output: {}", reason);
        }
        Ok(output)
    }

    fn extract_entities(&self, text: &str) -> Result<ModelOutput<EntitySet>, Self::Error> {
        let prompt = EntityPrompt::new(self.truncate(text)).build();

        let response = self.call_llm(ENTITY_SYSTEM_PROMPT, &prompt)?;
        let output = parse_entities(&response);
        if let ModelOutput::Malformed { reason, .. } = &output {
            warn!("Malformed entity output: {}", reason);
        }
        Ok(output)
    }
}
