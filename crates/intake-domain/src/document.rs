//! Input documents

/// One unit of input: an email or a file, reduced to its body text
///
/// `body` holds the message text followed by the text of every attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path or other identifier of the source
    pub source: String,

    /// Extracted plain text
    pub body: String,
}

impl Document {
    /// Create a new document
    pub fn new(source: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            body: body.into(),
        }
    }

    /// Whether the body is empty or whitespace only
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }
}
