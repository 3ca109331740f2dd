//! Error types for document extraction

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a document
#[derive(Error, Debug)]
pub enum IngestError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No extractor for this file extension
    #[error("Unsupported format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// The file is not a parseable email
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// PDF text extraction failed
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// Word document could not be read
    #[error("DOCX extraction failed: {0}")]
    Docx(String),

    /// Workbook could not be read
    #[error("Spreadsheet extraction failed: {0}")]
    Spreadsheet(String),

    /// Extraction produced no text
    #[error("No text found in {}", .0.display())]
    Empty(PathBuf),
}
