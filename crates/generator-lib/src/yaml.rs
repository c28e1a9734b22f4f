//! YAML emission helpers
//!
//! Builders produce `serde_json::Value` trees; this module strips empty
//! fields from them and serializes one or more documents.

use serde_json::Value;

use crate::error::Result;

/// Separator placed between documents of a multi-document stream
pub const DOCUMENT_SEPARATOR: &str = "---\n";

/// Recursively drop `null`, empty strings, empty arrays and empty objects.
///
/// `false`, `0` and any non-empty value are kept. Containers emptied by the
/// pass are dropped as well, so applying it twice yields the same tree.
pub fn clean(value: Value) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) => clean_nested(value).unwrap_or_else(|| Value::Object(Default::default())),
        other => other,
    }
}

fn clean_nested(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::Array(items) => {
            let items: Vec<Value> = items.into_iter().filter_map(clean_nested).collect();
            if items.is_empty() {
                None
            } else {
                Some(Value::Array(items))
            }
        }
        Value::Object(map) => {
            let map: serde_json::Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| clean_nested(v).map(|v| (k, v)))
                .collect();
            if map.is_empty() {
                None
            } else {
                Some(Value::Object(map))
            }
        }
        other => Some(other),
    }
}

/// Serialize a single document
pub fn to_yaml<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_yaml::to_string(value)?)
}

/// Serialize several documents into one `---` separated stream
pub fn to_multi_document(docs: &[Value]) -> Result<String> {
    let mut parts = Vec::with_capacity(docs.len());
    for doc in docs {
        parts.push(to_yaml(doc)?);
    }
    Ok(parts.join(DOCUMENT_SEPARATOR))
}
