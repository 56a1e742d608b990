//! Applying planned insertions to an editable buffer.

use std::ops::Range;

use anyhow::{Result, bail};

use crate::domain::model::Insertion;

/// Editable text the planner's insertions are written into.
pub trait TextBuffer {
    /// Current contents of the buffer.
    fn text(&self) -> &str;

    /// Insert `text` at byte `offset`.
    fn insert(&mut self, offset: usize, text: &str) -> Result<()>;
}

impl TextBuffer for String {
    fn text(&self) -> &str {
        self
    }

    fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        if offset > self.len() || !self.is_char_boundary(offset) {
            bail!("insert offset {offset} is not a character boundary");
        }
        self.insert_str(offset, text);
        Ok(())
    }
}

/// Byte offsets of every line start, counted the same way as
/// [`split_lines`](crate::app::document::split_lines).
pub fn line_starts(text: &str) -> Vec<usize> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut starts = vec![0];
    starts.extend(
        text.match_indices('\n')
            .map(|(idx, _)| idx + 1)
            .filter(|&start| start < text.len()),
    );
    starts
}

/// Outcome of applying a batch of insertions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedMerge {
    /// Number of lines inserted, separators included.
    pub inserted: usize,
    /// Byte ranges of the inserted non-empty lines in the final buffer.
    pub selections: Vec<Range<usize>>,
}

/// Write `insertions` (ordered by `at_line`) into `buffer`.
///
/// Offsets are resolved against the line layout before the first write and
/// shifted by everything inserted so far. A buffer without a trailing newline
/// gets one before anything is appended at its end.
pub fn apply_insertions<B: TextBuffer + ?Sized>(
    buffer: &mut B,
    insertions: &[Insertion],
) -> Result<AppliedMerge> {
    if insertions.is_empty() {
        return Ok(AppliedMerge::default());
    }
    if !insertions.is_sorted_by_key(|insertion| insertion.at_line) {
        bail!("insertions must be ordered by target line");
    }

    let starts = line_starts(buffer.text());
    let mut end = buffer.text().len();
    if end > 0 && !buffer.text().ends_with('\n') {
        buffer.insert(end, "\n")?;
        end += 1;
    }

    let mut applied = AppliedMerge::default();
    let mut shift = 0;
    for insertion in insertions {
        let at = shift + starts.get(insertion.at_line).copied().unwrap_or(end);
        let line = format!("{}\n", insertion.text);
        buffer.insert(at, &line)?;
        if !insertion.text.is_empty() {
            applied.selections.push(at..at + insertion.text.len());
        }
        shift += line.len();
        applied.inserted += 1;
    }

    tracing::debug!(
        inserted = applied.inserted,
        selections = applied.selections.len(),
        "applied insertions"
    );
    Ok(applied)
}
