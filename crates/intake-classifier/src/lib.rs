//! Intake Classifier
//!
//! Classifies documents against a request taxonomy and extracts their
//! structured fields, using an LLM.
//!
//! # Overview
//!
//! [`LlmClassifier`] implements the `ClassificationService` trait from
//! `intake-domain` on top of any `LlmProvider`. It builds the prompts, asks
//! the provider for JSON output and parses the reply into
//! `ModelOutput<Classification>` or `ModelOutput<EntitySet>`. Replies that
//! cannot be parsed come back as `ModelOutput::Malformed`, never as errors;
//! only transport failures are errors.
//!
//! # Architecture
//!
//! ```text
//! Text + Taxonomy → prompt → LlmProvider (JSON mode) → parser → ModelOutput
//! ```
//!
//! # Example Usage
//!
//! ```
//! use intake_classifier::{ClassifierConfig, LlmClassifier};
//! use intake_domain::traits::ClassificationService;
//! use intake_domain::{ModelOutput, Taxonomy};
//! use intake_llm::MockProvider;
//!
//! let llm = MockProvider::new(
//!     r#"{"request_type": "Fee Payment", "sub_request_type": "Ongoing Fee", "confidence_score": 0.92}"#,
//! );
//! let classifier = LlmClassifier::new(llm, ClassifierConfig::default());
//!
//! let taxonomy = Taxonomy::commercial_lending();
//! match classifier.classify("Please pay the ongoing fee", &taxonomy).unwrap() {
//!     ModelOutput::Parsed(c) => assert_eq!(c.sub_request_type, "Ongoing Fee"),
//!     ModelOutput::Malformed { reason, .. } => panic!("{}", reason),
//! }
//! ```

#![warn(missing_docs)]

mod classifier;
mod config;
mod error;
mod parser;
mod prompt;


pub use classifier::LlmClassifier;
pub use config::ClassifierConfig;
pub use error::ClassifierError;
pub use parser::{parse_classification, parse_entities};
pub use prompt::{
    ClassificationPrompt, EntityPrompt, CLASSIFICATION_SYSTEM_PROMPT, ENTITY_SYSTEM_PROMPT,
};
