//! Data models for annotation review summaries.
//!
//! This module contains the structures read from task snapshots
//! (controls, annotations, results) and the structures written
//! into the summary report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

/// Path separator used for taxonomy paths when the control sets none.
pub const DEFAULT_PATH_SEPARATOR: &str = " / ";

/// Kind of a control tag, parsed from its declared type string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ControlKind {
    /// Any `*labels` tag (labels, rectanglelabels, brushlabels, ...).
    /// Carries the declared type name, which is also the value key.
    Labels(String),
    Choices,
    Taxonomy,
    Rating,
    Number,
    Pairwise,
    Ranker,
    TextArea,
    DateTime,
    /// Type strings with no dedicated handling.
    Other(String),
}

impl ControlKind {
    /// Returns the declared type string.
    pub fn as_str(&self) -> &str {
        match self {
            ControlKind::Labels(name) => name,
            ControlKind::Choices => "choices",
            ControlKind::Taxonomy => "taxonomy",
            ControlKind::Rating => "rating",
            ControlKind::Number => "number",
            ControlKind::Pairwise => "pairwise",
            ControlKind::Ranker => "ranker",
            ControlKind::TextArea => "textarea",
            ControlKind::DateTime => "datetime",
            ControlKind::Other(name) => name,
        }
    }
}

impl From<&str> for ControlKind {
    fn from(s: &str) -> Self {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "choices" => ControlKind::Choices,
            "taxonomy" => ControlKind::Taxonomy,
            "rating" => ControlKind::Rating,
            "number" => ControlKind::Number,
            "pairwise" => ControlKind::Pairwise,
            "ranker" => ControlKind::Ranker,
            "textarea" => ControlKind::TextArea,
            "datetime" => ControlKind::DateTime,
            _ if lower.ends_with("labels") => ControlKind::Labels(lower),
            _ => ControlKind::Other(lower),
        }
    }
}

impl From<String> for ControlKind {
    fn from(s: String) -> Self {
        ControlKind::from(s.as_str())
    }
}

impl From<ControlKind> for String {
    fn from(kind: ControlKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ControlKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Display colors attached to a label value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl LabelAttrs {
    /// Background only, as used for choice chips.
    pub fn background_only(&self) -> Self {
        Self {
            background: self.background.clone(),
            border: None,
            color: None,
        }
    }
}

/// Schema definition for one labeling field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    /// Unique control name; results reference it through `from_name`.
    pub name: String,
    /// Declared control type.
    #[serde(rename = "type")]
    pub kind: ControlKind,
    /// Label value to display colors, used for lookups.
    #[serde(default)]
    pub label_attrs: HashMap<String, LabelAttrs>,
    /// Whether values attach to regions instead of the whole task.
    #[serde(default)]
    pub per_region: bool,
    /// Separator for taxonomy paths.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_separator: Option<String>,
}

impl Control {
    #[allow(dead_code)] // Builder utility
    pub fn new(name: &str, kind: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: ControlKind::from(kind),
            label_attrs: HashMap::new(),
            per_region: false,
            path_separator: None,
        }
    }

    /// Returns the taxonomy path separator.
    pub fn path_separator(&self) -> &str {
        self.path_separator
            .as_deref()
            .unwrap_or(DEFAULT_PATH_SEPARATOR)
    }

    /// Returns the display colors configured for a label, if any.
    pub fn attrs_for(&self, label: &str) -> Option<&LabelAttrs> {
        self.label_attrs.get(label)
    }
}

/// One annotation result as exported, before shape validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResult {
    /// Name of the control that produced this result.
    pub from_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_name: Option<String>,
    /// Result type, matching the control's type.
    #[serde(rename = "type")]
    pub result_type: String,
    /// Raw value; its shape depends on `result_type`.
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

impl RawResult {
    #[allow(dead_code)] // Builder utility
    pub fn new(from_name: &str, result_type: &str, value: Value) -> Self {
        Self {
            from_name: from_name.to_string(),
            to_name: None,
            result_type: result_type.to_string(),
            value,
            id: None,
        }
    }
}

/// One reviewer's submission for a task.
///
/// Results are read one by one; records that do not parse are skipped and
/// counted in `malformed` instead of failing the whole annotation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "AnnotationRecord")]
pub struct Annotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Reviewer who submitted the annotation: a user id, an email or a
    /// user object, depending on the export.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<Value>,
    /// Ordered results.
    pub results: Vec<RawResult>,
    /// Result records skipped while parsing.
    #[serde(skip)]
    pub malformed: usize,
}

/// Annotation as exported, before its results are parsed.
#[derive(Deserialize)]
struct AnnotationRecord {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    completed_by: Option<Value>,
    #[serde(default, alias = "result")]
    results: Value,
}

impl From<AnnotationRecord> for Annotation {
    fn from(record: AnnotationRecord) -> Self {
        let items = match record.results {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                debug!("Annotation results are not a list: {}", other);
                vec![other]
            }
        };

        let mut results = Vec::with_capacity(items.len());
        let mut malformed = 0;
        for item in items {
            match serde_json::from_value::<RawResult>(item) {
                Ok(result) => results.push(result),
                Err(e) => {
                    debug!("Skipping malformed result: {}", e);
                    malformed += 1;
                }
            }
        }

        Self {
            id: record.id.filter(|id| !id.is_null()),
            completed_by: record.completed_by.filter(|who| !who.is_null()),
            results,
            malformed,
        }
    }
}

impl Annotation {
    /// Returns a short display name for table rows.
    pub fn display_name(&self, index: usize) -> String {
        if let Some(who) = self.completed_by.as_ref().and_then(reviewer_name) {
            return who;
        }

        match &self.id {
            Some(Value::String(id)) => format!("#{}", id),
            Some(Value::Number(id)) => format!("#{}", id),
            _ => format!("Annotation {}", index + 1),
        }
    }

    /// Results produced by the named control, in result order.
    pub fn results_for<'a>(&'a self, control: &'a str) -> impl Iterator<Item = &'a RawResult> {
        self.results.iter().filter(move |r| r.from_name == control)
    }
}

fn reviewer_name(who: &Value) -> Option<String> {
    match who {
        Value::String(name) if !name.is_empty() => Some(name.clone()),
        Value::Number(id) => Some(format!("User {}", id)),
        Value::Object(user) => user
            .get("email")
            .and_then(Value::as_str)
            .filter(|email| !email.is_empty())
            .map(String::from)
            .or_else(|| user.get("id").and_then(reviewer_name)),
        _ => None,
    }
}

/// Everything needed to summarize one task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    /// Control schema, in display order.
    #[serde(default)]
    pub controls: Vec<Control>,
    /// Annotations, in display order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Task data fields.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Object tag type per data field (`image`, `audio`, `text`, ...).
    #[serde(default)]
    pub data_types: HashMap<String, String>,
}

impl TaskSnapshot {
    /// Returns a display title for the task.
    pub fn title(&self, index: usize) -> String {
        match &self.id {
            Some(Value::String(id)) => format!("Task {}", id),
            Some(Value::Number(id)) => format!("Task {}", id),
            _ => format!("Task {}", index + 1),
        }
    }
}

/// A label or token with its occurrence count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Count {
    pub value: String,
    pub count: usize,
}

/// A label count with its display colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
    #[serde(default)]
    pub colors: LabelAttrs,
}

/// A value's share of all annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Share {
    pub value: String,
    pub count: usize,
    /// Percentage of annotations, rounded to one decimal.
    pub percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

/// One ranker bucket with its ordered item ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: String,
    pub items: Vec<String>,
}

/// Outcome of aggregating one control across all annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Aggregation {
    /// No results to aggregate.
    NoData,
    /// Rating results exist but none carries a rating.
    NoRatings,
    /// The control kind has no aggregate view.
    NotApplicable,
    LabelCounts(Vec<LabelCount>),
    ChoicePercentages(Vec<Share>),
    TaxonomyPathPercentages(Vec<Share>),
    PairwiseCounts(Vec<Count>),
    RatingAverage(f64),
    NumberAverage(f64),
    RankerBuckets(Vec<Bucket>),
}

impl Aggregation {
    /// Whether the outcome carries no values.
    pub fn is_empty(&self) -> bool {
        match self {
            Aggregation::NoData | Aggregation::NoRatings | Aggregation::NotApplicable => true,
            Aggregation::LabelCounts(v) => v.is_empty(),
            Aggregation::ChoicePercentages(v) | Aggregation::TaxonomyPathPercentages(v) => {
                v.is_empty()
            }
            Aggregation::PairwiseCounts(v) => v.is_empty(),
            Aggregation::RankerBuckets(v) => v.is_empty(),
            Aggregation::RatingAverage(_) | Aggregation::NumberAverage(_) => false,
        }
    }
}

/// Aggregated view of one control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSummary {
    pub control: String,
    pub kind: ControlKind,
    /// Number of results the control received across annotations.
    pub result_count: usize,
    pub aggregation: Aggregation,
}

/// One annotation row of the summary table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationRow {
    pub annotation: String,
    /// One cell per control, in control order; `None` renders empty.
    pub cells: Vec<Option<String>>,
}

/// A task data field prepared for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCell {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub text: String,
    pub truncated: bool,
}

/// Summary of a single task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub title: String,
    pub annotation_count: usize,
    pub controls: Vec<ControlSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<AnnotationRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<DataCell>,
}

/// Metadata about the summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Input file or directory.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub files_loaded: usize,
    pub tasks: usize,
    pub annotations: usize,
    /// Results dropped during validation.
    pub results_dropped: usize,
    /// Files and task records that could not be parsed.
    #[serde(default)]
    pub records_skipped: usize,
}

/// The complete summary report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub tasks: Vec<TaskSummary>,
}
