//! Snapshot loader for discovering, parsing and validating task snapshots.
//!
//! A snapshot file holds one task object or an array of task objects.
//! The input may be a single file or a directory, which is searched
//! recursively for `.json` files.

use crate::error::SnapshotError;
use crate::models::TaskSnapshot;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Options for loading snapshots.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Fail on validation issues instead of dropping the offending data.
    pub strict: bool,
    /// Show a progress bar when loading several files.
    pub show_progress: bool,
}

/// Everything read from the input.
#[derive(Debug, Default)]
pub struct LoadedSnapshots {
    /// Number of files read.
    pub files: usize,
    /// Validated snapshots, in file order.
    pub tasks: Vec<TaskSnapshot>,
    /// Results dropped during validation.
    pub dropped: usize,
    /// Files and task records skipped because they could not be parsed.
    pub skipped: usize,
}

/// Tasks parsed from one snapshot file.
#[derive(Debug, Default)]
pub struct ParsedSnapshots {
    pub tasks: Vec<TaskSnapshot>,
    /// Task records that failed to parse.
    pub skipped: usize,
}

/// Loader for snapshot files.
pub struct SnapshotLoader {
    root: PathBuf,
    options: LoadOptions,
}

impl SnapshotLoader {
    /// Create a new loader for a file or directory.
    pub fn new(root: PathBuf, options: LoadOptions) -> Self {
        Self { root, options }
    }

    /// Find the snapshot files to load, sorted by path.
    pub fn discover(&self) -> Result<Vec<PathBuf>, SnapshotError> {
        if self.root.is_file() {
            return Ok(vec![self.root.clone()]);
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path.to_path_buf());
            }
        }

        if files.is_empty() {
            return Err(SnapshotError::Empty(self.root.clone()));
        }

        Ok(files)
    }

    /// Load and validate every snapshot.
    ///
    /// Outside strict mode, files of a directory input that cannot be read
    /// or parsed are skipped with a warning.
    pub fn load(&self) -> Result<LoadedSnapshots, SnapshotError> {
        let files = self.discover()?;
        let skip_bad_files = !self.options.strict && self.root.is_dir();
        let mut loaded = LoadedSnapshots {
            files: files.len(),
            ..Default::default()
        };

        let progress_bar = if self.options.show_progress && files.len() > 1 {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        for path in &files {
            if let Some(ref pb) = progress_bar {
                pb.set_message(path.display().to_string());
            }

            match self.load_file(path) {
                Ok(parsed) => {
                    loaded.skipped += parsed.skipped;
                    for mut snapshot in parsed.tasks {
                        let title = snapshot.title(loaded.tasks.len());
                        loaded.dropped += validate(&mut snapshot, &title, self.options.strict)?;
                        loaded.tasks.push(snapshot);
                    }
                }
                Err(e) if skip_bad_files => {
                    warn!("{}; skipping file", e);
                    loaded.skipped += 1;
                }
                Err(e) => return Err(e),
            }

            if let Some(ref pb) = progress_bar {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress_bar {
            pb.finish_and_clear();
        }

        if loaded.tasks.is_empty() && loaded.skipped > 0 {
            return Err(SnapshotError::NothingLoaded {
                path: self.root.clone(),
                skipped: loaded.skipped,
            });
        }

        debug!(
            "Loaded {} tasks from {} files ({} results dropped, {} records skipped)",
            loaded.tasks.len(),
            loaded.files,
            loaded.dropped,
            loaded.skipped
        );

        Ok(loaded)
    }

    fn load_file(&self, path: &Path) -> Result<ParsedSnapshots, SnapshotError> {
        let content = fs::read_to_string(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        parse_snapshots(&content, path, self.options.strict)
    }
}

/// Parse a snapshot file holding one task or an array of tasks.
///
/// Each task record is parsed on its own. Outside strict mode, records
/// that do not parse are skipped with a warning.
pub fn parse_snapshots(content: &str, path: &Path, strict: bool) -> Result<ParsedSnapshots, SnapshotError> {
    let parsed: Value = serde_json::from_str(content).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let records = match parsed {
        Value::Array(records) => records,
        record => vec![record],
    };

    let mut out = ParsedSnapshots::default();
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<TaskSnapshot>(record) {
            Ok(task) => out.tasks.push(task),
            Err(source) => {
                let err = SnapshotError::InvalidTask {
                    path: path.to_path_buf(),
                    index: index + 1,
                    source,
                };
                if strict {
                    return Err(err);
                }
                warn!("{}; skipping it", err);
                out.skipped += 1;
            }
        }
    }

    Ok(out)
}

/// Check that control names are unique and that every result references a
/// known control.
///
/// Outside strict mode, duplicate controls after the first are removed and
/// results that were malformed or reference unknown controls are dropped.
/// Returns the number of results dropped.
pub fn validate(snapshot: &mut TaskSnapshot, title: &str, strict: bool) -> Result<usize, SnapshotError> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for control in &snapshot.controls {
        if !seen.insert(control.name.clone()) {
            duplicates.push(control.name.clone());
        }
    }

    if let Some(name) = duplicates.first() {
        let err = SnapshotError::DuplicateControl {
            task: title.to_string(),
            name: name.clone(),
        };
        if strict {
            return Err(err);
        }
        warn!("{}; keeping the first definition", err);

        let mut kept = HashSet::new();
        snapshot.controls.retain(|c| kept.insert(c.name.clone()));
    }

    let malformed: usize = snapshot.annotations.iter().map(|a| a.malformed).sum();
    if malformed > 0 {
        let err = SnapshotError::MalformedResults {
            task: title.to_string(),
            count: malformed,
        };
        if strict {
            return Err(err);
        }
        warn!("{}; dropping them", err);
    }

    let mut unknown: HashMap<String, usize> = HashMap::new();
    for annotation in &snapshot.annotations {
        for result in &annotation.results {
            if !seen.contains(&result.from_name) {
                *unknown.entry(result.from_name.clone()).or_default() += 1;
            }
        }
    }

    if unknown.is_empty() {
        return Ok(malformed);
    }

    let mut names: Vec<_> = unknown.into_iter().collect();
    names.sort();

    if strict {
        let (name, count) = names.swap_remove(0);
        return Err(SnapshotError::UnknownControl {
            task: title.to_string(),
            name,
            count,
        });
    }

    let mut dropped = 0;
    for (name, count) in &names {
        warn!(
            "{}; dropping them",
            SnapshotError::UnknownControl {
                task: title.to_string(),
                name: name.clone(),
                count: *count,
            }
        );
        dropped += count;
    }

    for annotation in &mut snapshot.annotations {
        annotation.results.retain(|r| seen.contains(&r.from_name));
    }

    Ok(malformed + dropped)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}
