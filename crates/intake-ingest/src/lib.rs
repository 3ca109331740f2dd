//! Intake Ingest
//!
//! Turns files on disk into [`Document`](intake_domain::Document)s by
//! implementing [`DocumentSource`](intake_domain::traits::DocumentSource).
//!
//! Supported formats, chosen by extension:
//!
//! - `.eml`: body text plus the text of supported attachments
//! - `.txt`, `.md`, `.csv`, `.log`: read as UTF-8, invalid bytes replaced
//! - `.html`, `.htm`: visible text
//! - `.pdf`: extracted text
//! - `.docx`: paragraph text
//! - `.xlsx`, `.xlsm`, `.xlsb`, `.xls`, `.ods`: every sheet, one line per row

#![warn(missing_docs)]

mod error;
mod html;
mod source;

pub use error::IngestError;
pub use html::html_to_text;
pub use source::{FileKind, FileSource};
