//! Value extraction from raw annotation results.
//!
//! Raw result values are duck-typed JSON whose shape depends on the
//! result type. `extract` finds the semantic value inside a result and
//! `typed_value` validates it into a [`ResultValue`]. Malformed shapes
//! degrade to [`ResultValue::Missing`] or drop the offending elements;
//! nothing here returns an error.

use crate::models::{Bucket, ControlKind, RawResult};
use serde_json::Value;
use tracing::debug;

/// A result value validated against its declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Labels(Vec<String>),
    Choices(Vec<String>),
    /// Selected paths, each an ordered list of segments.
    Taxonomy(Vec<Vec<String>>),
    Rating(f64),
    Number(f64),
    Pairwise(Vec<String>),
    Ranker(Vec<Bucket>),
    TextArea(Vec<String>),
    DateTime(String),
    Other(Value),
    Missing,
}

/// Returns the semantic value of a result.
///
/// Textarea results keep their value under `text`; every other type keys
/// it by the type name. `None` means "no value".
pub fn extract(result: &RawResult) -> Option<&Value> {
    let key = if result.result_type == "textarea" {
        "text"
    } else {
        result.result_type.as_str()
    };

    match result.value.get(key) {
        Some(Value::Null) | None => None,
        Some(value) => Some(value),
    }
}

/// Extracts and validates a result value according to its type.
pub fn typed_value(result: &RawResult) -> ResultValue {
    let kind = ControlKind::from(result.result_type.as_str());

    // Pairwise results store the chosen side under `selected`.
    let raw = match (&kind, extract(result)) {
        (ControlKind::Pairwise, None) => result.value.get("selected").filter(|v| !v.is_null()),
        (_, raw) => raw,
    };

    let Some(raw) = raw else {
        return ResultValue::Missing;
    };

    let parsed = match kind {
        ControlKind::Labels(_) => ResultValue::Labels(flatten_strings(raw)),
        ControlKind::Choices => ResultValue::Choices(flatten_strings(raw)),
        ControlKind::Taxonomy => parse_paths(raw).map_or(ResultValue::Missing, ResultValue::Taxonomy),
        ControlKind::Rating => parse_number(raw).map_or(ResultValue::Missing, ResultValue::Rating),
        ControlKind::Number => parse_number(raw).map_or(ResultValue::Missing, ResultValue::Number),
        ControlKind::Pairwise => ResultValue::Pairwise(parse_pairwise(raw)),
        ControlKind::Ranker => parse_buckets(raw).map_or(ResultValue::Missing, ResultValue::Ranker),
        ControlKind::TextArea => ResultValue::TextArea(flatten_strings(raw)),
        ControlKind::DateTime => match raw {
            Value::String(s) => ResultValue::DateTime(s.clone()),
            _ => ResultValue::Missing,
        },
        ControlKind::Other(_) => ResultValue::Other(raw.clone()),
    };

    if parsed == ResultValue::Missing {
        debug!(
            "Malformed {} value from '{}': {}",
            result.result_type, result.from_name, raw
        );
    }

    parsed
}

/// Collects every string in a value, descending into nested arrays.
fn flatten_strings(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_strings(value, &mut out);
    out
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => {
            for item in items {
                collect_strings(item, out);
            }
        }
        _ => {}
    }
}

fn parse_paths(value: &Value) -> Option<Vec<Vec<String>>> {
    let items = value.as_array()?;

    let paths = items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(vec![s.clone()]),
            Value::Array(_) => Some(flatten_strings(item)),
            _ => None,
        })
        .filter(|path| !path.is_empty())
        .collect();

    Some(paths)
}

fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

fn parse_pairwise(value: &Value) -> Vec<String> {
    match value {
        Value::Object(map) => map
            .get("selected")
            .and_then(Value::as_str)
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
        other => flatten_strings(other),
    }
}

fn parse_buckets(value: &Value) -> Option<Vec<Bucket>> {
    let map = value.as_object()?;

    let buckets = map
        .iter()
        .map(|(name, items)| Bucket {
            name: name.clone(),
            items: items
                .as_array()
                .map(|items| items.iter().filter_map(item_id).collect())
                .unwrap_or_default(),
        })
        .collect();

    Some(buckets)
}

fn item_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
