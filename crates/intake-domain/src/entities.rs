//! Extracted entity sets

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured fields extracted from a document
///
/// The schema is open: keys are whatever the extraction model detected, and
/// values may be any JSON. Nothing in the pipeline looks inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntitySet(Value);

impl EntitySet {
    /// An empty object
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Wrap an arbitrary JSON value
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    /// Look up a top-level field, if the set is an object
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// True for `null`, `{}` and `[]`
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Borrow the underlying value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Take the underlying value
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl Default for EntitySet {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for EntitySet {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty() {
        assert!(EntitySet::empty().is_empty());
        assert!(EntitySet::from_value(Value::Null).is_empty());
        assert!(!EntitySet::from_value(json!({"amount": "$1M"})).is_empty());
    }

    #[test]
    fn test_get_field() {
        let set = EntitySet::from_value(json!({"deal_name": "ABC Facility", "amount": 1000000}));
        assert_eq!(set.get("deal_name"), Some(&json!("ABC Facility")));
        assert_eq!(set.get("missing"), None);
    }

    #[test]
    fn test_transparent_serde() {
        let set = EntitySet::from_value(json!({"nested": {"a": [1, 2]}}));
        let text = serde_json::to_string(&set).unwrap();
        assert_eq!(text, r#"{"nested":{"a":[1,2]}}"#);
    }
}
