//! Typed results of parsing model output

/// Result of turning free-form model output into a typed value
///
/// Parsing failures are values, not errors: a model that answered with
/// prose or broken JSON did respond, and callers need to tell that apart
/// from a failed request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelOutput<T> {
    /// The output parsed into the expected shape
    Parsed(T),

    /// The output could not be parsed
    Malformed {
        /// The raw model output
        raw: String,
        /// Why parsing failed
        reason: String,
    },
}

impl<T> ModelOutput<T> {
    /// Create a `Malformed` output
    pub fn malformed(raw: impl Into<String>, reason: impl Into<String>) -> Self {
        ModelOutput::Malformed {
            raw: raw.into(),
            reason: reason.into(),
        }
    }

    /// Whether the output parsed
    pub fn is_parsed(&self) -> bool {
        matches!(self, ModelOutput::Parsed(_))
    }

    /// Convert into a `Result`, keeping the failure reason
    pub fn into_result(self) -> Result<T, String> {
        match self {
            ModelOutput::Parsed(value) => Ok(value),
            ModelOutput::Malformed { reason, .. } => Err(reason),
        }
    }

    /// Map the parsed value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ModelOutput<U> {
        match self {
            ModelOutput::Parsed(value) => ModelOutput::Parsed(f(value)),
            ModelOutput::Malformed { raw, reason } => ModelOutput::Malformed { raw, reason },
        }
    }
}
