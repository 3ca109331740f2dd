//! Parse LLM output into classifications and entity sets

use intake_domain::{Classification, EntitySet, ModelOutput};
use serde_json::{Map, Value};
use tracing::debug;

/// Parse a classification reply
///
/// Accepts a single object, or an array of objects when the model found
/// several requests; in that case the item with the highest confidence wins
/// and invalid items are skipped.
pub fn parse_classification(raw: &str) -> ModelOutput<Classification> {
    let json = match parse_json(raw) {
        Ok(json) => json,
        Err(reason) => return ModelOutput::malformed(raw, reason),
    };

    match json {
        Value::Object(obj) => match classification_from_object(&obj) {
            Ok(c) => ModelOutput::Parsed(c),
            Err(reason) => ModelOutput::malformed(raw, reason),
        },
        Value::Array(items) => {
            let mut best: Option<Classification> = None;
            let mut last_error = "Empty classification array".to_string();

            for (idx, item) in items.iter().enumerate() {
                let parsed = item
                    .as_object()
                    .ok_or_else(|| "Classification is not a JSON object".to_string())
                    .and_then(classification_from_object);
                match parsed {
                    Ok(c) => {
                        if best
                            .as_ref()
                            .map_or(true, |b| c.confidence_score > b.confidence_score)
                        {
                            best = Some(c);
                        }
                    }
                    Err(e) => {
                        debug!("Skipping classification {}: {}", idx, e);
                        last_error = e;
                    }
                }
            }

            match best {
                Some(c) => ModelOutput::Parsed(c),
                None => ModelOutput::malformed(raw, last_error),
            }
        }
        other => ModelOutput::malformed(
            raw,
            format!("Expected JSON object or array, got {}", json_kind(&other)),
        ),
    }
}

/// Parse an entity extraction reply
///
/// Any JSON object is accepted. A JSON string whose contents are themselves
/// a JSON object is unwrapped.
pub fn parse_entities(raw: &str) -> ModelOutput<EntitySet> {
    let json = match parse_json(raw) {
        Ok(json) => json,
        Err(reason) => return ModelOutput::malformed(raw, reason),
    };

    match json {
        Value::Object(_) => ModelOutput::Parsed(EntitySet::from_value(json)),
        Value::String(inner) => match serde_json::from_str::<Value>(inner.trim()) {
            Ok(value @ Value::Object(_)) => ModelOutput::Parsed(EntitySet::from_value(value)),
            _ => ModelOutput::malformed(raw, "Expected JSON object, got string"),
        },
        other => ModelOutput::malformed(
            raw,
            format!("Expected JSON object, got {}", json_kind(&other)),
        ),
    }
}

fn classification_from_object(obj: &Map<String, Value>) -> Result<Classification, String> {
    let request_type = obj
        .get("request_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing or invalid 'request_type'".to_string())?
        .trim()
        .to_string();

    let sub_request_type = obj
        .get("sub_request_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Missing or invalid 'sub_request_type'".to_string())?
        .trim()
        .to_string();

    let confidence_score = obj
        .get("confidence_score")
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .ok_or_else(|| "Missing or invalid 'confidence_score'".to_string())?;

    let classification = Classification::new(request_type, sub_request_type, confidence_score);
    classification.validate()?;
    Ok(classification)
}

/// Extract JSON from a reply, handling markdown code fences and prose
/// around the payload
fn parse_json(raw: &str) -> Result<Value, String> {
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        return Err("Empty response".to_string());
    }

    match serde_json::from_str(body) {
        Ok(value) => Ok(value),
        Err(e) => embedded_json(body).ok_or_else(|| format!("JSON parse error: {}", e)),
    }
}

fn strip_code_fence(trimmed: &str) -> &str {
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => "",
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn embedded_json(text: &str) -> Option<Value> {
    let start = text.find(['{', '['])?;
    let close = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
