//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.revsummary.toml` files.

use crate::cli::OutputFormat;
use crate::layout::DEFAULT_COLLAPSED_LINES;
use crate::report::data::DEFAULT_MAX_JSON_LENGTH;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".revsummary.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Default output format (`markdown` or `json`).
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Fail on snapshot validation issues instead of dropping data.
    #[serde(default)]
    pub strict: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            format: default_format(),
            verbose: false,
            strict: false,
        }
    }
}

fn default_output() -> String {
    "task_summary.md".to_string()
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include one row per annotation in the summary table.
    #[serde(default = "default_true")]
    pub include_annotations: bool,

    /// Include the task data section.
    #[serde(default = "default_true")]
    pub include_data: bool,

    /// Show the distribution row expanded.
    #[serde(default)]
    pub expand: bool,

    /// Characters per line when measuring distribution cells.
    #[serde(default = "default_column_width")]
    pub column_width: usize,

    /// Height of the collapsed distribution row, in lines.
    #[serde(default = "default_collapsed_lines")]
    pub collapsed_lines: usize,

    /// Maximum length of structured task data before truncation.
    #[serde(default = "default_max_json_length")]
    pub max_json_length: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_annotations: true,
            include_data: true,
            expand: false,
            column_width: default_column_width(),
            collapsed_lines: default_collapsed_lines(),
            max_json_length: default_max_json_length(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_column_width() -> usize {
    40
}

fn default_collapsed_lines() -> usize {
    DEFAULT_COLLAPSED_LINES
}

fn default_max_json_length() -> usize {
    DEFAULT_MAX_JSON_LENGTH
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided CLI values override the config.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(format) = args.format {
            self.general.format = format.as_str().to_string();
        }
        if let Some(width) = args.column_width {
            self.report.column_width = width;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
        if args.strict {
            self.general.strict = true;
        }
        if args.expand {
            self.report.expand = true;
        }
        if args.no_annotations {
            self.report.include_annotations = false;
        }
        if args.no_data {
            self.report.include_data = false;
        }
    }

    /// Effective output format. Unknown names fall back to Markdown.
    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from_name(&self.general.format).unwrap_or_default()
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
