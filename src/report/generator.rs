//! Summary report generation.
//!
//! This module builds the report model from loaded snapshots and
//! renders it as Markdown or JSON.

use crate::analysis::summarize;
use crate::config::ReportConfig;
use crate::layout::{clamp_lines, wrap, Fingerprint, OverflowRow};
use crate::loader::LoadedSnapshots;
use crate::models::{
    AnnotationRow, ControlSummary, DataCell, Report, ReportMetadata, TaskSnapshot, TaskSummary,
};
use crate::report::cells::render_cell;
use crate::report::data::summarize_data;
use crate::report::present::present;
use anyhow::Result;
use chrono::Utc;
use tracing::debug;

/// Build the summary of one task.
pub fn build_task_summary(snapshot: &TaskSnapshot, index: usize, config: &ReportConfig) -> TaskSummary {
    let rows = if config.include_annotations {
        snapshot
            .annotations
            .iter()
            .enumerate()
            .map(|(i, annotation)| AnnotationRow {
                annotation: annotation.display_name(i),
                cells: snapshot
                    .controls
                    .iter()
                    .map(|control| {
                        let results: Vec<_> = annotation.results_for(&control.name).collect();
                        render_cell(control, &results).map(|p| p.to_plain_text())
                    })
                    .collect(),
            })
            .collect()
    } else {
        Vec::new()
    };

    let data = if config.include_data {
        summarize_data(snapshot, config.max_json_length)
    } else {
        Vec::new()
    };

    TaskSummary {
        title: snapshot.title(index),
        annotation_count: snapshot.annotations.len(),
        controls: summarize(snapshot),
        rows,
        data,
    }
}

/// Build the complete report from loaded snapshots.
pub fn build_report(loaded: &LoadedSnapshots, source: &str, config: &ReportConfig) -> Report {
    let tasks: Vec<TaskSummary> = loaded
        .tasks
        .iter()
        .enumerate()
        .map(|(i, snapshot)| build_task_summary(snapshot, i, config))
        .collect();

    let metadata = ReportMetadata {
        source: source.to_string(),
        generated_at: Utc::now(),
        files_loaded: loaded.files,
        tasks: tasks.len(),
        annotations: tasks.iter().map(|t| t.annotation_count).sum(),
        results_dropped: loaded.dropped,
        records_skipped: loaded.skipped,
    };

    Report { metadata, tasks }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, config: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Task Summary Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    if report.tasks.is_empty() {
        output.push_str("No tasks were found in the input.\n\n");
    }

    for task in &report.tasks {
        output.push_str(&generate_task_section(task, config));
    }

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Files Loaded:** {}\n", metadata.files_loaded));
    section.push_str(&format!("- **Tasks:** {}\n", metadata.tasks));
    section.push_str(&format!("- **Annotations:** {}\n", metadata.annotations));
    if metadata.results_dropped > 0 {
        section.push_str(&format!(
            "- **Results Dropped:** {}\n",
            metadata.results_dropped
        ));
    }
    if metadata.records_skipped > 0 {
        section.push_str(&format!(
            "- **Records Skipped:** {}\n",
            metadata.records_skipped
        ));
    }
    section.push('\n');

    section
}

/// Generate the section for a single task.
fn generate_task_section(task: &TaskSummary, config: &ReportConfig) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", task.title));
    section.push_str(&format!("*Annotations: {}*\n\n", task.annotation_count));

    if task.controls.is_empty() {
        section.push_str("No controls defined for this task.\n\n");
    } else {
        section.push_str(&generate_summary_table(task, config));
    }

    if !task.data.is_empty() {
        section.push_str(&generate_data_section(&task.data));
    }

    section
}

/// Generate the annotation table with its distribution row.
fn generate_summary_table(task: &TaskSummary, config: &ReportConfig) -> String {
    let mut table = String::new();

    table.push_str("| Annotation |");
    for control in &task.controls {
        table.push_str(&format!(" {} `{}` |", escape_cell(&control.control), control.kind));
    }
    table.push('\n');

    table.push_str("|:---|");
    for _ in &task.controls {
        table.push_str(":---|");
    }
    table.push('\n');

    for row in &task.rows {
        table.push_str(&format!("| {} |", escape_cell(&row.annotation)));
        for cell in &row.cells {
            table.push_str(&format!(" {} |", escape_cell(cell.as_deref().unwrap_or(""))));
        }
        table.push('\n');
    }

    table.push_str(&generate_distribution_row(task, config));
    table.push('\n');

    table
}

/// Generate the distribution row, clamping cells that overflow the
/// collapsed row height unless the row is expanded.
fn generate_distribution_row(task: &TaskSummary, config: &ReportConfig) -> String {
    let cells: Vec<(Vec<String>, bool)> = task
        .controls
        .iter()
        .map(|summary| {
            let presentation = present(&summary.aggregation);
            (
                wrap(&presentation.to_plain_text(), config.column_width),
                presentation.is_placeholder(),
            )
        })
        .collect();

    // Measure after the cells are laid out.
    let heights: Vec<usize> = cells.iter().map(|(lines, _)| lines.len()).collect();
    let mut row = OverflowRow::new();
    row.measure(distribution_fingerprint(task), config.collapsed_lines, &heights);
    if config.expand {
        row.toggle();
    }
    debug!(
        "Distribution row for {}: overflow={}, expanded={}",
        task.title,
        row.has_overflow(),
        row.is_expanded()
    );

    let header = match (row.has_overflow(), row.is_expanded()) {
        (false, _) => "**Distribution**",
        (true, false) => "**Distribution ▸**",
        (true, true) => "**Distribution ▾**",
    };

    let mut line = format!("| {} |", header);
    for (lines, placeholder) in &cells {
        let visible = row.visible_lines(lines.len(), config.collapsed_lines);
        let text = clamp_lines(lines, visible)
            .iter()
            .map(|l| escape_cell(l))
            .collect::<Vec<_>>()
            .join("<br>");

        if *placeholder {
            line.push_str(&format!(" _{}_ |", text));
        } else {
            line.push_str(&format!(" {} |", text));
        }
    }
    line.push('\n');

    line
}

fn distribution_fingerprint(task: &TaskSummary) -> Fingerprint {
    let controls: Vec<(&str, usize)> = task
        .controls
        .iter()
        .map(|c: &ControlSummary| (c.control.as_str(), c.result_count))
        .collect();
    Fingerprint::of(&(task.title.as_str(), task.annotation_count, controls))
}

/// Generate the task data section.
fn generate_data_section(data: &[DataCell]) -> String {
    let mut section = String::new();

    section.push_str("### Task Data\n\n");

    for cell in data {
        match cell.data_type.as_deref() {
            Some(data_type) => section.push_str(&format!("**{}** `{}`\n\n", cell.field, data_type)),
            None => section.push_str(&format!("**{}**\n\n", cell.field)),
        }

        if cell.text.contains('\n') {
            section.push_str("```\n");
            section.push_str(&cell.text);
            section.push_str("\n```\n\n");
        } else {
            section.push_str(&cell.text);
            section.push_str("\n\n");
        }

        if cell.truncated {
            section.push_str("*(truncated)*\n\n");
        }
    }

    section
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
