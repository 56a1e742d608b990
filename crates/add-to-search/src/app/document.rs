//! Line classification and parsing of aggregation documents.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::{DocGroup, EntryKey, GroupMember, SourceEntry};

/// `path:` with no leading whitespace.
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^ \t].*):$").expect("heading pattern compiles"));
/// `<spaces><digits>:` prefix of a collected line.
static MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^ +([0-9]+):").expect("member pattern compiles"));

/// Split document text into lines the way the buffer applier counts them.
///
/// A trailing newline does not open an extra line, so `"a\n"` is one line and
/// `"a\n\n"` is two (the second blank). Carriage returns before `\n` are dropped.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Return the path named by a heading line.
pub fn match_heading(line: &str) -> Option<&str> {
    HEADING
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse a member line into its 0-indexed source entry.
///
/// The returned text is everything after the `<spaces><digits>:` prefix,
/// including the formatting space. Display number `0` or numbers that do not
/// fit in `usize` are not members.
pub fn match_member(line: &str) -> Option<SourceEntry> {
    let caps = MEMBER.captures(line)?;
    let prefix = caps.get(0)?;
    let display: usize = caps.get(1)?.as_str().parse().ok()?;
    let number = display.checked_sub(1)?;
    Some(SourceEntry::new(number, &line[prefix.end()..]))
}

/// Parse the document into one group per heading line, in document order.
pub fn parse_groups<S: AsRef<str>>(lines: &[S]) -> Vec<DocGroup> {
    let mut groups = Vec::new();
    let mut current: Option<DocGroup> = None;

    for (index, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if let Some(path) = match_heading(line) {
            groups.extend(current.take());
            current = Some(DocGroup {
                path: path.to_owned(),
                heading_line: index,
                members: Vec::new(),
            });
            continue;
        }

        if let Some(group) = current.as_mut()
            && let Some(entry) = match_member(line)
        {
            group.members.push(GroupMember {
                doc_line: index,
                entry,
            });
        }
    }

    groups.extend(current);
    groups
}

/// Paths of every heading in the document.
pub fn heading_paths<S: AsRef<str>>(lines: &[S]) -> HashSet<String> {
    lines
        .iter()
        .filter_map(|line| match_heading(line.as_ref()))
        .map(str::to_owned)
        .collect()
}

/// The group new entries for `path` are anchored to.
///
/// Documents are expected to hold one heading per path; if a path repeats, the
/// last heading wins.
pub fn find_group<'a>(groups: &'a [DocGroup], path: &str) -> Option<&'a DocGroup> {
    groups.iter().rev().find(|group| group.path == path)
}

/// Keys of every occurrence already recorded for `path`, across all of its headings.
pub fn existing_keys(groups: &[DocGroup], path: &str) -> HashSet<EntryKey> {
    groups
        .iter()
        .filter(|group| group.path == path)
        .flat_map(|group| group.members.iter().map(|member| member.entry.key()))
        .collect()
}
