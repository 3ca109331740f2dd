//! Intake Pipeline
//!
//! Orchestrates duplicate detection, classification and entity extraction
//! for incoming documents.
//!
//! ## Flow
//!
//! 1. Embed the document body once
//! 2. Query the similarity index for the nearest stored entry
//! 3. If its similarity is above `duplicate_threshold`, reuse its
//!    classification and stop
//! 4. Otherwise classify the body and extract its fields
//! 5. Apply the confidence and taxonomy rules
//! 6. Store the new entry in the index
//!
//! ## Example
//!
//! ```ignore
//! use intake_pipeline::{Pipeline, PipelineConfig};
//! use intake_domain::Document;
//!
//! let pipeline = Pipeline::new(embedder, classifier, index, PipelineConfig::default())?;
//! let record = pipeline.process(Document::new("a.eml", body)).await?;
//! println!("{} / {}", record.request_type, record.sub_request_type);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod normalize;
mod pipeline;
mod types;

pub use config::PipelineConfig;
pub use error::{PipelineError, Stage};
pub use normalize::normalize;
pub use pipeline::Pipeline;
pub use types::{BatchSummary, DocumentOutcome};
