//! Errors raised where snapshot data enters the tool.

use std::path::PathBuf;
use thiserror::Error;

/// Problems found while loading or validating a task snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid task #{index} in {}: {source}", .path.display())]
    InvalidTask {
        path: PathBuf,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("no snapshot files found under {}", .0.display())]
    Empty(PathBuf),

    #[error("no valid snapshots under {} ({skipped} skipped)", .path.display())]
    NothingLoaded { path: PathBuf, skipped: usize },

    #[error("duplicate control name '{name}' in {task}")]
    DuplicateControl { task: String, name: String },

    #[error("{count} result(s) in {task} reference unknown control '{name}'")]
    UnknownControl {
        task: String,
        name: String,
        count: usize,
    },

    #[error("{count} malformed result(s) in {task}")]
    MalformedResults { task: String, count: usize },
}

impl SnapshotError {
    /// Validation issues can be tolerated outside strict mode.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SnapshotError::InvalidTask { .. }
                | SnapshotError::DuplicateControl { .. }
                | SnapshotError::UnknownControl { .. }
                | SnapshotError::MalformedResults { .. }
        )
    }
}
