//! Occurrence identity used to keep re-merges idempotent.

use std::collections::HashSet;

use crate::domain::model::{EntryKey, SourceEntry};

/// Entries of a batch that are not yet represented, sorted by line number.
///
/// `existing` is the snapshot of keys taken from the document before anything
/// from this batch is inserted. Repeats inside the batch collapse to their first
/// occurrence. The sort is stable, so entries sharing a line number keep their
/// batch order.
pub fn missing_entries(entries: &[SourceEntry], existing: &HashSet<EntryKey>) -> Vec<SourceEntry> {
    let mut seen: HashSet<EntryKey> = HashSet::with_capacity(entries.len());
    let mut missing: Vec<SourceEntry> = entries
        .iter()
        .filter(|entry| {
            let key = entry.key();
            !existing.contains(&key) && seen.insert(key)
        })
        .cloned()
        .collect();
    missing.sort_by_key(|entry| entry.line);
    missing
}
