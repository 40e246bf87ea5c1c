//! Item normalization and parameter merging for multi-task fan-out.
//!
//! A batch job runs one task per input item. The item source is a JSON
//! value: an array fans out one task per element, an object fans out
//! one task per entry (normalized into `{"key": ..., "value": ...}`
//! records in iteration order), and `null` fans out to zero tasks.
//! Anything else is a usage error.

use serde_json::{json, Map, Value};

use crate::error::CoreError;

/// Per-task parameter dictionary: parameter name to arbitrary value.
pub type ParameterSet = Map<String, Value>;

/// Normalize an item source into a dense sequence of per-task values.
///
/// - `Null` yields zero items.
/// - An array yields its elements in order.
/// - An object yields one `{"key": k, "value": v}` record per entry,
///   in the object's iteration order.
/// - Any other type is a [`CoreError::InvalidItems`] usage error.
pub fn normalize_items(items: &Value) -> Result<Vec<Value>, CoreError> {
    match items {
        Value::Null => Ok(Vec::new()),
        Value::Array(elements) => Ok(elements.clone()),
        Value::Object(entries) => Ok(entries
            .iter()
            .map(|(key, value)| json!({ "key": key, "value": value }))
            .collect()),
        other => Err(CoreError::InvalidItems(json_type_name(other))),
    }
}

/// Merge constant upstream values into a per-task parameter set.
///
/// A constant is injected only when its key is absent; per-task values
/// always take precedence over same-named constants.
pub fn merge_constants(task_params: &mut ParameterSet, constants: &ParameterSet) {
    for (key, value) in constants {
        if !task_params.contains_key(key) {
            task_params.insert(key.clone(), value.clone());
        }
    }
}

/// Human-readable JSON type name for error messages.
fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
