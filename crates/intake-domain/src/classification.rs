//! Classification results

use serde::{Deserialize, Serialize};

/// Request type used when a document cannot be confidently classified
pub const FALLBACK_REQUEST_TYPE: &str = "Others";

/// Sub-request type paired with [`FALLBACK_REQUEST_TYPE`]
pub const FALLBACK_SUB_REQUEST_TYPE: &str = "Unknown";

/// The request intent of a document
///
/// `confidence_score` lies in [0.0, 1.0]. The pair of type names either
/// belongs to the configured taxonomy or is the fallback pair
/// (`"Others"`, `"Unknown"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Top-level request type
    pub request_type: String,

    /// Sub-request type within `request_type`
    pub sub_request_type: String,

    /// Confidence of the classifier in [0.0, 1.0]
    pub confidence_score: f64,
}

impl Classification {
    /// Create a new classification
    pub fn new(
        request_type: impl Into<String>,
        sub_request_type: impl Into<String>,
        confidence_score: f64,
    ) -> Self {
        Self {
            request_type: request_type.into(),
            sub_request_type: sub_request_type.into(),
            confidence_score,
        }
    }

    /// The fallback pair carrying the given confidence score
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_domain::Classification;
    ///
    /// let c = Classification::fallback(0.4);
    /// assert_eq!(c.request_type, "Others");
    /// assert_eq!(c.sub_request_type, "Unknown");
    /// assert!(c.is_fallback());
    /// ```
    pub fn fallback(confidence_score: f64) -> Self {
        Self::new(
            FALLBACK_REQUEST_TYPE,
            FALLBACK_SUB_REQUEST_TYPE,
            confidence_score,
        )
    }

    /// Whether this is the fallback pair
    pub fn is_fallback(&self) -> bool {
        self.request_type == FALLBACK_REQUEST_TYPE
            && self.sub_request_type == FALLBACK_SUB_REQUEST_TYPE
    }

    /// Check that the type names are present and the score is a valid probability
    pub fn validate(&self) -> Result<(), String> {
        if self.request_type.trim().is_empty() {
            return Err("request_type is empty".to_string());
        }
        if self.sub_request_type.trim().is_empty() {
            return Err("sub_request_type is empty".to_string());
        }
        if !self.confidence_score.is_finite() {
            return Err(format!(
                "confidence_score {} is not a finite number",
                self.confidence_score
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_score) {
            return Err(format!(
                "confidence_score {} out of range [0.0, 1.0]",
                self.confidence_score
            ));
        }
        Ok(())
    }
}
