//! File-backed document source

use crate::error::IngestError;
use crate::html::html_to_text;
use calamine::{open_workbook_auto_from_rs, Reader};
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use intake_domain::traits::DocumentSource;
use intake_domain::Document;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Kind of file, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// RFC 822 email
    Email,
    /// Plain text, Markdown, CSV or log file
    Text,
    /// HTML page
    Html,
    /// PDF document
    Pdf,
    /// Word document
    Docx,
    /// Excel or OpenDocument workbook
    Spreadsheet,
}

impl FileKind {
    /// Kind for a path, or `None` if its extension is not supported
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "eml" => Some(FileKind::Email),
            "txt" | "md" | "csv" | "log" => Some(FileKind::Text),
            "html" | "htm" => Some(FileKind::Html),
            "pdf" => Some(FileKind::Pdf),
            "docx" => Some(FileKind::Docx),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(FileKind::Spreadsheet),
            _ => None,
        }
    }
}

/// Reads documents from the local filesystem
///
/// The body of an email is its last inline text part (an HTML part is reduced
/// to text) followed by the text of every supported attachment.
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    attachment_dir: Option<PathBuf>,
}

impl FileSource {
    /// Create a source that keeps attachments in memory only
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write every email attachment into `dir`
    pub fn with_attachment_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.attachment_dir = Some(dir.into());
        self
    }

    /// Read a file and return its text
    pub fn extract_text(&self, path: &Path) -> Result<String, IngestError> {
        let kind = FileKind::from_path(path)
            .ok_or_else(|| IngestError::UnsupportedFormat(path.to_path_buf()))?;
        let bytes = fs::read(path)?;
        self.text_from_bytes(kind, &bytes)
    }

    fn text_from_bytes(&self, kind: FileKind, bytes: &[u8]) -> Result<String, IngestError> {
        match kind {
            FileKind::Email => self.email_text(bytes),
            FileKind::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
            FileKind::Html => Ok(html_to_text(&String::from_utf8_lossy(bytes))),
            FileKind::Pdf => pdf_extract::extract_text_from_mem(bytes)
                .map_err(|e| IngestError::Pdf(e.to_string())),
            FileKind::Docx => docx_text(bytes),
            FileKind::Spreadsheet => spreadsheet_text(bytes),
        }
    }

    fn email_text(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let message = MessageParser::default()
            .parse(bytes)
            .ok_or_else(|| IngestError::InvalidEmail("no message headers found".to_string()))?;

        let body = inline_body(&message);

        let mut attachments = Vec::new();
        for part in message.attachments() {
            let Some(name) = part.attachment_name() else {
                debug!("Skipping unnamed attachment");
                continue;
            };
            let Some(file_name) = Path::new(name).file_name() else {
                warn!(name, "Skipping attachment with invalid name");
                continue;
            };

            if let Some(dir) = &self.attachment_dir {
                fs::create_dir_all(dir)?;
                fs::write(dir.join(file_name), part.contents())?;
            }

            let Some(kind) = FileKind::from_path(Path::new(file_name)) else {
                warn!(name, "Skipping attachment of unsupported format");
                continue;
            };
            match self.text_from_bytes(kind, part.contents()) {
                Ok(text) => attachments.push(text),
                Err(e) => warn!(name, "Skipping unreadable attachment: {}", e),
            }
        }
        debug!(attachments = attachments.len(), "Parsed email");

        Ok(format!("{}\n{}", body.trim(), attachments.join("\n")))
    }
}

/// Walk the parts in order; each inline text/plain or text/html part replaces
/// the body found so far.
fn inline_body(message: &Message<'_>) -> String {
    let mut body = String::new();
    for part in &message.parts {
        if part.content_disposition().is_some() {
            continue;
        }
        match &part.body {
            PartType::Text(text) if is_plain_text(part) => body = text.to_string(),
            PartType::Html(html) => body = html_to_text(html),
            _ => {}
        }
    }
    body
}

fn is_plain_text(part: &MessagePart<'_>) -> bool {
    part.content_type()
        .and_then(|ct| ct.subtype())
        .map_or(true, |subtype| subtype.eq_ignore_ascii_case("plain"))
}

fn docx_text(bytes: &[u8]) -> Result<String, IngestError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| IngestError::Docx(e.to_string()))?;
    let paragraphs: Vec<String> = docx
        .document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect();
    Ok(paragraphs.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    paragraph
        .children
        .iter()
        .filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run),
            _ => None,
        })
        .flat_map(|run| run.children.iter())
        .filter_map(|child| match child {
            RunChild::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect()
}

/// Every sheet, one line per non-empty row, cells separated by tabs
fn spreadsheet_text(bytes: &[u8]) -> Result<String, IngestError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IngestError::Spreadsheet(e.to_string()))?;

    let mut lines = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| IngestError::Spreadsheet(e.to_string()))?;
        for row in range.rows() {
            let cells: Vec<String> = row.iter().map(|cell| cell.to_string()).collect();
            if cells.iter().any(|cell| !cell.is_empty()) {
                lines.push(cells.join("\t"));
            }
        }
    }
    Ok(lines.join("\n"))
}

impl DocumentSource for FileSource {
    type Error = IngestError;

    fn extract_body(&self, path: &Path) -> Result<Document, Self::Error> {
        let text = self.extract_text(path)?;
        if text.trim().is_empty() {
            return Err(IngestError::Empty(path.to_path_buf()));
        }
        debug!(path = %path.display(), chars = text.len(), "Extracted document");
        Ok(Document::new(path.display().to_string(), text))
    }
}
