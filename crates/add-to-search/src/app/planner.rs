//! Per-file merge planning against a fixed parse of the document.

use std::collections::HashSet;
use std::iter;

use crate::app::dedup::missing_entries;
use crate::domain::model::{DocGroup, EntryKey, FileBatch, Insertion};

/// Where new heading blocks are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentTail {
    /// Line count of the document; new blocks are inserted at this index.
    pub at_line: usize,
    /// Whether a blank separator must precede the next appended heading.
    pub needs_separator: bool,
}

impl DocumentTail {
    pub fn of<S: AsRef<str>>(lines: &[S]) -> Self {
        let needs_separator = lines
            .last()
            .is_some_and(|last| !last.as_ref().trim().is_empty());
        Self {
            at_line: lines.len(),
            needs_separator,
        }
    }
}

/// Render a member line: a space, the 1-indexed number right-aligned in four
/// columns, `: `, then the text.
pub fn format_member_line(line: usize, text: &str) -> String {
    format!(" {:>4}: {}", line + 1, text)
}

/// Render a heading line for `path`.
pub fn format_heading(path: &str) -> String {
    format!("{path}:")
}

/// Plan the insertions that bring `batch` into the document.
///
/// `group` is the existing block for the batch's path, if any, and `existing`
/// the keys already recorded for that path. Entries are interleaved into an
/// existing block by line number; an entry that shares a line number with a
/// member but carries different text lands after that member. Without a block,
/// a heading (plus separator) is appended at `tail` and all entries follow it.
pub fn plan_file_merge(
    group: Option<&DocGroup>,
    existing: &HashSet<EntryKey>,
    batch: &FileBatch,
    tail: DocumentTail,
) -> Vec<Insertion> {
    let missing = missing_entries(&batch.entries, existing);
    if missing.is_empty() {
        tracing::debug!(path = %batch.path, "nothing new to merge");
        return Vec::new();
    }

    let mut insertions = Vec::with_capacity(missing.len() + 2);
    let Some(group) = group else {
        if tail.needs_separator {
            insertions.push(Insertion::new(tail.at_line, ""));
        }
        insertions.push(Insertion::new(tail.at_line, format_heading(&batch.path)));
        insertions.extend(
            missing
                .iter()
                .map(|entry| Insertion::new(tail.at_line, format_member_line(entry.line, &entry.text))),
        );
        tracing::debug!(path = %batch.path, entries = missing.len(), "planned new heading block");
        return insertions;
    };

    let anchors = iter::once(group.heading_line).chain(group.members.iter().map(|m| m.doc_line));
    let bounds = group
        .members
        .iter()
        .map(|m| Some(m.entry.line))
        .chain(iter::once(None));

    let mut pending = missing.iter().peekable();
    for (anchor, bound) in anchors.zip(bounds) {
        while let Some(entry) =
            pending.next_if(|entry| bound.is_none_or(|bound| entry.line < bound))
        {
            insertions.push(Insertion::new(
                anchor + 1,
                format_member_line(entry.line, &entry.text),
            ));
        }
    }

    tracing::debug!(
        path = %batch.path,
        heading = group.heading_line,
        entries = insertions.len(),
        "planned merge into existing block"
    );
    insertions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::document::{existing_keys, find_group, parse_groups};
    use crate::domain::model::SourceEntry;

    fn plan(lines: &[&str], batch: &FileBatch) -> Vec<Insertion> {
        let groups = parse_groups(lines);
        plan_file_merge(
            find_group(&groups, &batch.path),
            &existing_keys(&groups, &batch.path),
            batch,
            DocumentTail::of(lines),
        )
    }

    fn batch(path: &str, entries: &[(usize, &str)]) -> FileBatch {
        FileBatch::new(
            path,
            entries
                .iter()
                .map(|(line, text)| SourceEntry::new(*line, *text))
                .collect(),
        )
    }

    #[test]
    fn formats_member_lines() {
        assert_eq!(format_member_line(2, "bar"), "    3: bar");
        assert_eq!(format_member_line(12344, "x"), " 12345: x");
        assert_eq!(format_heading("/a.txt"), "/a.txt:");
    }

    #[test]
    fn new_block_in_empty_document_has_no_separator() {
        let insertions = plan(&[], &batch("/a.txt", &[(4, "foo"), (2, "bar")]));
        assert_eq!(
            insertions,
            vec![
                Insertion::new(0, "/a.txt:"),
                Insertion::new(0, "    3: bar"),
                Insertion::new(0, "    5: foo"),
            ]
        );
    }

    #[test]
    fn new_block_after_content_gets_one_separator() {
        let lines = ["/b.txt:", "    1: x"];
        let insertions = plan(&lines, &batch("/a.txt", &[(0, "y")]));
        assert_eq!(
            insertions,
            vec![
                Insertion::new(2, ""),
                Insertion::new(2, "/a.txt:"),
                Insertion::new(2, "    1: y"),
            ]
        );
    }

    #[test]
    fn new_block_after_blank_line_skips_separator() {
        let lines = ["/b.txt:", "    1: x", ""];
        let insertions = plan(&lines, &batch("/a.txt", &[(0, "y")]));
        assert_eq!(insertions[0], Insertion::new(3, "/a.txt:"));
        assert_eq!(insertions.len(), 2);
    }

    #[test]
    fn interleaves_into_existing_block_by_line_number() {
        let lines = ["/a.txt:", "    2: two", "    6: six", "", "/b.txt:"];
        let insertions = plan(
            &lines,
            &batch("/a.txt", &[(8, "nine"), (0, "one"), (3, "four")]),
        );
        assert_eq!(
            insertions,
            vec![
                Insertion::new(1, "    1: one"),
                Insertion::new(2, "    4: four"),
                Insertion::new(3, "    9: nine"),
            ]
        );
    }

    #[test]
    fn revisited_line_with_new_text_goes_after_old_text() {
        let lines = ["/a.txt:", "    5: old", "    7: later"];
        let insertions = plan(&lines, &batch("/a.txt", &[(4, "new")]));
        assert_eq!(insertions, vec![Insertion::new(2, "    5: new")]);
    }

    #[test]
    fn existing_entries_are_dropped() {
        let lines = ["/a.txt:", "    5: foo"];
        assert!(plan(&lines, &batch("/a.txt", &[(4, "foo")])).is_empty());
        assert!(plan(&lines, &batch("/a.txt", &[(4, "  foo  ")])).is_empty());
    }

    #[test]
    fn heading_without_members_takes_entries_directly_after_it() {
        let lines = ["/a.txt:", "", "/b.txt:", "    1: x"];
        let insertions = plan(&lines, &batch("/a.txt", &[(3, "d"), (1, "b")]));
        assert_eq!(
            insertions,
            vec![Insertion::new(1, "    2: b"), Insertion::new(1, "    4: d")]
        );
    }

    #[test]
    fn empty_batch_plans_nothing() {
        assert!(plan(&[], &batch("/a.txt", &[])).is_empty());
        assert!(plan(&["/a.txt:"], &batch("/a.txt", &[])).is_empty());
    }
}
