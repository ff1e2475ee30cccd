//! Pulling structured data out of free-form model output.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Greedy match from the first `{` to the last `}`.
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("json object regex is valid"));

/// Find and parse the JSON object embedded in `text`.
///
/// Models like to wrap JSON in prose or markdown fences; anything outside the
/// outermost braces is ignored. Returns `None` when no object parses.
pub fn first_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let candidate = JSON_OBJECT_RE.find(text)?.as_str();
    match serde_json::from_str::<Value>(candidate.trim()) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Model output did not contain valid JSON");
            None
        }
    }
}

/// Flatten an object's scalar members to strings. Nulls, blanks, arrays and
/// nested objects are dropped.
pub fn string_fields(map: &serde_json::Map<String, Value>) -> HashMap<String, String> {
    map.iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s.trim().to_string(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            (!text.is_empty()).then(|| (key.clone(), text))
        })
        .collect()
}
