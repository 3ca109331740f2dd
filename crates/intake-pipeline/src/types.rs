//! Batch result types

use crate::error::PipelineError;
use intake_domain::ProcessedRecord;
use serde::Serialize;

/// The outcome of processing one input in a batch
#[derive(Debug)]
pub struct DocumentOutcome {
    /// Path or identifier of the input
    pub source: String,

    /// The record, or why there is none
    pub result: Result<ProcessedRecord, PipelineError>,
}

impl DocumentOutcome {
    /// The record, including one carried by a partial success
    pub fn record(&self) -> Option<&ProcessedRecord> {
        match &self.result {
            Ok(record) => Some(record),
            Err(e) => e.partial_record(),
        }
    }

    /// Whether the document was processed and persisted as needed
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Counts over a batch of outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    /// Inputs processed
    pub total: usize,

    /// Documents classified and stored as new entries
    pub new_entries: usize,

    /// Documents matched to an existing entry
    pub duplicates: usize,

    /// Documents classified whose entry could not be stored
    pub partial: usize,

    /// Documents with no record at all
    pub failed: usize,
}

impl BatchSummary {
    /// Tally a batch
    pub fn from_outcomes(outcomes: &[DocumentOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Self::default()
        };

        for outcome in outcomes {
            match &outcome.result {
                Ok(record) if record.is_duplicate => summary.duplicates += 1,
                Ok(_) => summary.new_entries += 1,
                Err(e) if e.is_partial_success() => summary.partial += 1,
                Err(_) => summary.failed += 1,
            }
        }

        summary
    }

    /// Whether any input did not complete fully
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.partial > 0
    }
}
