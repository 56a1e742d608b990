//! Capturing selected lines as merge batches.

use std::collections::HashSet;
use std::str::FromStr;

use crate::app::document::{parse_groups, split_lines};
use crate::app::merge::coalesce_batches;
use crate::domain::errors::DomainError;
use crate::domain::model::{FileBatch, SourceEntry};

/// A set of selected 0-indexed lines, stored as sorted, disjoint, inclusive ranges.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineSelection {
    ranges: Vec<(usize, usize)>,
}

impl LineSelection {
    /// Create an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Select every line of a `line_count`-line file.
    pub fn whole(line_count: usize) -> Self {
        let mut selection = Self::new();
        if line_count > 0 {
            selection.add_range(0, line_count - 1);
        }
        selection
    }

    /// Returns whether any line is selected.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Access the coalesced ranges.
    pub fn ranges(&self) -> &[(usize, usize)] {
        &self.ranges
    }

    /// Select a single line.
    pub fn add_line(&mut self, line: usize) {
        self.add_range(line, line);
    }

    /// Select an inclusive range. Reversed bounds are accepted; overlapping or
    /// touching ranges are merged.
    pub fn add_range(&mut self, start: usize, end: usize) {
        let mut range = (start.min(end), start.max(end));
        self.ranges.retain(|&existing| {
            if ranges_mergeable(range, existing) {
                range = (range.0.min(existing.0), range.1.max(existing.1));
                false
            } else {
                true
            }
        });
        let position = self
            .ranges
            .iter()
            .position(|existing| existing.0 > range.1)
            .unwrap_or(self.ranges.len());
        self.ranges.insert(position, range);
    }

    pub fn contains(&self, line: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| start <= line && line <= end)
    }

    /// Selected lines in ascending order.
    pub fn lines(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().flat_map(|&(start, end)| start..=end)
    }
}

impl FromStr for LineSelection {
    type Err = DomainError;

    /// Parse 1-indexed specs such as `3`, `7-9` or `3,7-9`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidLineSpec(value.to_owned());
        let mut selection = Self::new();
        for part in value.split(',').map(str::trim) {
            let (start, end) = match part.split_once('-') {
                Some((start, end)) => (start.trim(), end.trim()),
                None => (part, part),
            };
            let start: usize = start.parse().map_err(|_| invalid())?;
            let end: usize = end.parse().map_err(|_| invalid())?;
            if start == 0 || end == 0 {
                return Err(invalid());
            }
            selection.add_range(start - 1, end - 1);
        }
        Ok(selection)
    }
}

fn ranges_mergeable(a: (usize, usize), b: (usize, usize)) -> bool {
    let (a_start, a_end) = a;
    let (b_start, b_end) = b;
    a_start <= b_end.saturating_add(1) && b_start <= a_end.saturating_add(1)
}

/// Whether `path` names an aggregation document.
pub fn is_aggregation(path: &str, extension: &str) -> bool {
    !extension.is_empty() && path.ends_with(extension)
}

/// Capture the selected lines of a plain source file, verbatim.
pub fn batch_from_source(path: &str, text: &str, selection: &LineSelection) -> FileBatch {
    let lines = split_lines(text);
    let entries = selection
        .lines()
        .map_while(|line| lines.get(line).map(|text| SourceEntry::new(line, *text)))
        .collect();
    FileBatch::new(path, entries)
}

/// Capture selected lines of an aggregation document as batches for their source paths.
///
/// A selected heading registers its path even without selected members. Member
/// text loses its formatting space; repeats collapse by entry key.
pub fn batches_from_document<S: AsRef<str>>(
    lines: &[S],
    selection: &LineSelection,
) -> Vec<FileBatch> {
    let mut captured = Vec::new();
    for group in parse_groups(lines) {
        let entries: Vec<SourceEntry> = group
            .members
            .iter()
            .filter(|member| selection.contains(member.doc_line))
            .map(|member| SourceEntry::new(member.entry.line, member.entry.logical_text()))
            .collect();
        if !entries.is_empty() || selection.contains(group.heading_line) {
            captured.push(FileBatch::new(group.path, entries));
        }
    }

    coalesce_batches(captured)
        .into_iter()
        .map(|mut batch| {
            let mut seen = HashSet::new();
            batch.entries.retain(|entry| seen.insert(entry.key()));
            batch.entries.sort_by_key(|entry| entry.line);
            batch
        })
        .collect()
}
