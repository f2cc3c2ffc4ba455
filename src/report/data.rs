//! Task data formatting.
//!
//! Task data fields are shown next to the annotation summary. Media
//! fields become links or images; structured values are pretty-printed
//! JSON, truncated past a configurable length.

use crate::models::{DataCell, TaskSnapshot};
use serde_json::Value;

/// Default maximum length of pretty-printed JSON values.
pub const DEFAULT_MAX_JSON_LENGTH: usize = 10_000;

/// Format one task data field for display.
pub fn format_data_value(
    field: &str,
    value: &Value,
    data_type: Option<&str>,
    max_len: usize,
) -> DataCell {
    let (text, truncated) = match (data_type, value) {
        (Some("image"), Value::String(url)) => (format!("![{}]({})", field, url), false),
        (Some("audio") | Some("video"), Value::String(url)) => (format!("[{}]({})", field, url), false),
        (_, Value::String(s)) => (s.clone(), false),
        (_, Value::Object(_) | Value::Array(_)) => format_json(value, max_len),
        (_, Value::Null) => (String::new(), false),
        (_, other) => (other.to_string(), false),
    };

    DataCell {
        field: field.to_string(),
        data_type: data_type.map(String::from),
        text,
        truncated,
    }
}

/// Format every data field of a task, in field order.
pub fn summarize_data(snapshot: &TaskSnapshot, max_len: usize) -> Vec<DataCell> {
    snapshot
        .data
        .iter()
        .map(|(field, value)| {
            let data_type = snapshot.data_types.get(field).map(String::as_str);
            format_data_value(field, value, data_type, max_len)
        })
        .collect()
}

fn format_json(value: &Value, max_len: usize) -> (String, bool) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());

    if json.chars().count() <= max_len {
        (json, false)
    } else {
        let cut: String = json.chars().take(max_len).collect();
        (format!("{}...", cut), true)
    }
}
