//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use intake_domain::{EntitySet, Taxonomy};
use intake_pipeline::{BatchSummary, DocumentOutcome};
use serde_json::{json, Value};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the outcome of a processing run.
    pub fn format_outcomes(&self, outcomes: &[DocumentOutcome]) -> Result<String> {
        match self.format {
            OutputFormat::Json => self.format_outcomes_json(outcomes),
            OutputFormat::Table => Ok(self.format_outcomes_table(outcomes)),
            OutputFormat::Quiet => Ok(self.format_outcomes_quiet(outcomes)),
        }
    }

    fn format_outcomes_json(&self, outcomes: &[DocumentOutcome]) -> Result<String> {
        let documents = outcomes
            .iter()
            .map(|outcome| -> Result<Value> {
                let value = match (&outcome.result, outcome.record()) {
                    (Ok(record), _) => serde_json::to_value(record)?,
                    (Err(e), Some(record)) => {
                        let mut value = serde_json::to_value(record)?;
                        if let Value::Object(map) = &mut value {
                            map.insert("error".to_string(), json!(e.to_string()));
                        }
                        value
                    }
                    (Err(e), None) => json!({
                        "source": outcome.source,
                        "error": e.to_string(),
                        "stage": e.stage().map(|s| s.to_string()),
                    }),
                };
                Ok(value)
            })
            .collect::<Result<Vec<_>>>()?;

        let summary = BatchSummary::from_outcomes(outcomes);
        Ok(serde_json::to_string_pretty(&json!({
            "documents": documents,
            "summary": summary,
        }))?)
    }

    fn format_outcomes_table(&self, outcomes: &[DocumentOutcome]) -> String {
        if outcomes.is_empty() {
            return self.colorize("No documents processed.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record([
            "Source",
            "Request Type",
            "Sub Request Type",
            "Confidence",
            "Duplicate",
            "Extracted Fields",
        ]);

        for outcome in outcomes {
            match outcome.record() {
                Some(record) => {
                    let duplicate = if record.is_duplicate { "yes" } else { "no" };
                    let fields = match &outcome.result {
                        Ok(_) => format_entities(&record.entities),
                        Err(e) => format!("(not saved: {})", e),
                    };
                    builder.push_record([
                        record.source.clone(),
                        record.request_type.clone(),
                        record.sub_request_type.clone(),
                        format!("{:.2}", record.confidence_score),
                        duplicate.to_string(),
                        fields,
                    ]);
                }
                None => {
                    let error = outcome
                        .result
                        .as_ref()
                        .err()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    builder.push_record([
                        outcome.source.clone(),
                        self.colorize("error", "red"),
                        String::new(),
                        String::new(),
                        String::new(),
                        error,
                    ]);
                }
            }
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        format!("{}\n{}", table, self.summary(&BatchSummary::from_outcomes(outcomes)))
    }

    fn format_outcomes_quiet(&self, outcomes: &[DocumentOutcome]) -> String {
        outcomes
            .iter()
            .map(|outcome| match outcome.record() {
                Some(record) => format!(
                    "{}\t{}/{}\t{}",
                    record.source,
                    record.request_type,
                    record.sub_request_type,
                    if record.is_duplicate { "dup" } else { "new" }
                ),
                None => format!("{}\terror", outcome.source),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One-line summary of a run.
    pub fn summary(&self, summary: &BatchSummary) -> String {
        let line = format!(
            "{} document(s): {} new, {} duplicate, {} not saved, {} failed",
            summary.total, summary.new_entries, summary.duplicates, summary.partial, summary.failed
        );
        if summary.has_failures() {
            self.warning(&line)
        } else {
            self.success(&line)
        }
    }

    /// Format the taxonomy.
    pub fn format_taxonomy(&self, taxonomy: &Taxonomy) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(taxonomy)?),
            OutputFormat::Quiet => Ok(taxonomy.request_types().collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if taxonomy.is_empty() {
                    return Ok(self.colorize("Taxonomy is empty.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Request Type", "Sub Request Types"]);
                for request_type in taxonomy.request_types() {
                    let sub_types = taxonomy
                        .sub_types(request_type)
                        .map(|subs| subs.collect::<Vec<_>>().join(", "))
                        .unwrap_or_default();
                    builder.push_record([request_type.to_string(), sub_types]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// Render extracted fields as `key: value` pairs.
fn format_entities(entities: &EntitySet) -> String {
    match entities.as_value() {
        Value::Object(map) if map.is_empty() => "-".to_string(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{}: {}", key, s),
                other => format!("{}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
