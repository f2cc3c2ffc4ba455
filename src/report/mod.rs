//! Report modules: presentation of aggregates, per-annotation cells,
//! task data formatting, and Markdown/JSON generation.

pub mod cells;
pub mod data;
pub mod generator;
pub mod present;

pub use generator::{build_report, generate_json_report, generate_markdown_report};
