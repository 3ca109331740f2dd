//! CLI command definitions and argument parsing.

use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Intake - classify incoming service requests and detect duplicates.
#[derive(Debug, Parser)]
#[command(name = "intake")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "INTAKE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (one line per document)
    Quiet,
}

impl From<CliFormat> for OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => OutputFormat::Table,
            CliFormat::Json => OutputFormat::Json,
            CliFormat::Quiet => OutputFormat::Quiet,
        }
    }
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify documents and detect duplicates
    Process(ProcessArgs),

    /// Show the configured taxonomy
    Taxonomy,

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Arguments for the process command.
#[derive(Debug, Parser)]
pub struct ProcessArgs {
    /// Files to process (.eml, .txt, .md, .csv, .log, .html, .pdf)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Similarity above which a document is a duplicate (0.0-1.0)
    #[arg(long)]
    pub duplicate_threshold: Option<f64>,

    /// Confidence below which the classification becomes Others/Unknown (0.0-1.0)
    #[arg(long)]
    pub confidence_threshold: Option<f64>,

    /// Documents processed at once
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Save email attachments into this directory
    #[arg(long)]
    pub attachments: Option<PathBuf>,

    /// Use offline mock models and an in-memory index
    #[arg(long)]
    pub mock: bool,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}
