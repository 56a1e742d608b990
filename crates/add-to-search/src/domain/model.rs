//! Domain models for collected lines, document groups, and planned edits.

use serde::{Deserialize, Serialize};

/// One selected line from a source file. `line` is 0-indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub line: usize,
    pub text: String,
}

impl SourceEntry {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }

    /// Dedup key for this entry.
    pub fn key(&self) -> EntryKey {
        EntryKey::new(self.line, &self.text)
    }

    /// Member text with the single formatting space after `:` removed.
    pub fn logical_text(&self) -> &str {
        self.text.strip_prefix(' ').unwrap_or(&self.text)
    }
}

/// Identity of an occurrence: source line number plus trimmed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryKey {
    pub line: usize,
    pub text: String,
}

impl EntryKey {
    pub fn new(line: usize, text: &str) -> Self {
        Self {
            line,
            text: text.trim().to_owned(),
        }
    }
}

/// A selection's worth of lines for a single source path.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileBatch {
    pub path: String,
    pub entries: Vec<SourceEntry>,
}

impl FileBatch {
    pub fn new(path: impl Into<String>, entries: Vec<SourceEntry>) -> Self {
        Self {
            path: path.into(),
            entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A member line of a parsed group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Index of the member line within the document.
    pub doc_line: usize,
    pub entry: SourceEntry,
}

/// One heading of the aggregation document and the member lines beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocGroup {
    pub path: String,
    pub heading_line: usize,
    pub members: Vec<GroupMember>,
}

/// A planned line insertion.
///
/// The text is inserted as a whole line at the start of original document line
/// `at_line`, i.e. right after line `at_line - 1`. `at_line` equal to the
/// document length means end of document. Insertions sharing `at_line` are
/// applied in sequence order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insertion {
    pub at_line: usize,
    pub text: String,
}

impl Insertion {
    pub fn new(at_line: usize, text: impl Into<String>) -> Self {
        Self {
            at_line,
            text: text.into(),
        }
    }
}
