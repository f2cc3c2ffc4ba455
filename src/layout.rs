//! Overflow-aware distribution row.
//!
//! After the distribution cells are rendered, their content heights are
//! compared against the collapsed row height. When any cell overflows,
//! the row exposes a toggle that expands all cells together.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Default collapsed height of the distribution row, in lines.
pub const DEFAULT_COLLAPSED_LINES: usize = 2;

/// Identity of the inputs a row was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint any hashable snapshot of annotations and controls.
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Expand/collapse state of the distribution row.
#[derive(Debug, Clone, Default)]
pub struct OverflowRow {
    expanded: bool,
    has_overflow: bool,
    measured: Option<Fingerprint>,
}

impl OverflowRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record post-render measurements. Returns whether the row overflows.
    ///
    /// A row kept across renders skips the scan while the fingerprint is
    /// unchanged. The Markdown report renders each task once and measures
    /// a fresh row.
    pub fn measure(&mut self, fingerprint: Fingerprint, row_height: usize, cell_heights: &[usize]) -> bool {
        if self.measured == Some(fingerprint) {
            return self.has_overflow;
        }

        self.has_overflow = cell_heights.iter().any(|&h| h > row_height);
        self.measured = Some(fingerprint);
        debug!(
            "Measured {} cells against {} lines: overflow={}",
            cell_heights.len(),
            row_height,
            self.has_overflow
        );

        self.has_overflow
    }

    /// Flip between collapsed and expanded. Only overflowing rows toggle.
    pub fn toggle(&mut self) -> bool {
        if self.has_overflow {
            self.expanded = !self.expanded;
        }
        self.expanded
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn has_overflow(&self) -> bool {
        self.has_overflow
    }

    /// Lines shown for a cell with `content_lines` lines of content.
    pub fn visible_lines(&self, content_lines: usize, collapsed_lines: usize) -> usize {
        if self.expanded || !self.has_overflow {
            content_lines
        } else {
            content_lines.min(collapsed_lines)
        }
    }
}

/// Word-wrap text into lines of at most `width` characters.
///
/// Words longer than `width` are split. An empty string wraps to no lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();

        while chars.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(width);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let word_len = chars.len();
        if word_len == 0 {
            continue;
        }

        if current_len > 0 && current_len + 1 + word_len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars);
        current_len += word_len;
    }

    if current_len > 0 {
        lines.push(current);
    }

    lines
}

/// Clamp wrapped lines to `visible`, marking the cut with an ellipsis.
pub fn clamp_lines(lines: &[String], visible: usize) -> Vec<String> {
    if lines.len() <= visible {
        return lines.to_vec();
    }

    let mut kept: Vec<String> = lines[..visible].to_vec();
    if let Some(last) = kept.last_mut() {
        last.push('…');
    }
    kept
}
