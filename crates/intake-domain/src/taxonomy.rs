//! Request taxonomy - the permitted request types and their sub-types

use crate::classification::{FALLBACK_REQUEST_TYPE, FALLBACK_SUB_REQUEST_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Mapping from request type to its allowed sub-request types
///
/// The taxonomy is configuration: it is handed to the classifier on every
/// call so alternate taxonomies can be versioned and tested side by side.
/// It serialises as a plain map of `request_type -> [sub_request_type, ...]`.
///
/// # Examples
///
/// ```
/// use intake_domain::Taxonomy;
///
/// let taxonomy = Taxonomy::new()
///     .with_type("Fee Payment", ["Ongoing Fee", "Letter of Credit Fee"]);
///
/// assert!(taxonomy.contains("Fee Payment", "Ongoing Fee"));
/// assert!(!taxonomy.contains("Fee Payment", "Principal"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Taxonomy {
    types: BTreeMap<String, BTreeSet<String>>,
}

impl Taxonomy {
    /// Create an empty taxonomy
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`Taxonomy::insert`]
    pub fn with_type<I, S>(mut self, request_type: impl Into<String>, sub_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(request_type, sub_types);
        self
    }

    /// Add a request type with its sub-types, merging with any existing ones
    pub fn insert<I, S>(&mut self, request_type: impl Into<String>, sub_types: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types
            .entry(request_type.into())
            .or_default()
            .extend(sub_types.into_iter().map(Into::into));
    }

    /// Whether the (request type, sub-request type) pair is permitted
    pub fn contains(&self, request_type: &str, sub_request_type: &str) -> bool {
        self.types
            .get(request_type)
            .is_some_and(|subs| subs.contains(sub_request_type))
    }

    /// Whether the pair is permitted or is the fallback pair
    pub fn accepts(&self, request_type: &str, sub_request_type: &str) -> bool {
        (request_type == FALLBACK_REQUEST_TYPE && sub_request_type == FALLBACK_SUB_REQUEST_TYPE)
            || self.contains(request_type, sub_request_type)
    }

    /// Whether the request type is known
    pub fn has_request_type(&self, request_type: &str) -> bool {
        self.types.contains_key(request_type)
    }

    /// Request types in sorted order
    pub fn request_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Sub-types of a request type, if the type is known
    pub fn sub_types(&self, request_type: &str) -> Option<impl Iterator<Item = &str>> {
        self.types
            .get(request_type)
            .map(|subs| subs.iter().map(String::as_str))
    }

    /// Number of request types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the taxonomy has no request types
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Pretty JSON rendering, as embedded in classification prompts
    pub fn to_json_pretty(&self) -> String {
        // A map of strings to string sets always serialises.
        serde_json::to_string_pretty(&self.types).unwrap_or_else(|_| "{}".to_string())
    }

    /// Commercial lending servicing requests
    ///
    /// The request types a loan-servicing inbox typically receives. Used as
    /// the default taxonomy when none is configured.
    pub fn commercial_lending() -> Self {
        Self::new()
            .with_type(
                "Adjustment",
                ["Reallocation Fees", "Amendment Fees", "Reallocation Principal"],
            )
            .with_type("Closing Notice", ["Cashless Roll", "Decrease", "Increase"])
            .with_type("Fee Payment", ["Ongoing Fee", "Letter of Credit Fee"])
            .with_type(
                "Money Movement - Inbound",
                [
                    "Principal",
                    "Interest",
                    "Principal + Interest",
                    "Principal + Interest + Fee",
                ],
            )
            .with_type("Money Movement - Outbound", ["Timebound", "Foreign Currency"])
    }
}
