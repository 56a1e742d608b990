//! Multi-file merge orchestration.

use std::collections::HashMap;

use crate::app::document::{existing_keys, find_group, heading_paths, parse_groups};
use crate::app::planner::{DocumentTail, plan_file_merge};
use crate::domain::model::{FileBatch, Insertion};

/// Combine batches that share a path, keeping first-seen path order.
pub fn coalesce_batches(batches: impl IntoIterator<Item = FileBatch>) -> Vec<FileBatch> {
    let mut merged: Vec<FileBatch> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for batch in batches {
        match index.get(&batch.path) {
            Some(&slot) => merged[slot].entries.extend(batch.entries),
            None => {
                index.insert(batch.path.clone(), merged.len());
                merged.push(batch);
            }
        }
    }

    merged
}

/// Plan every insertion needed to merge `batches` into the document `lines`.
///
/// Paths that already have a heading are planned first, then paths that need a
/// new heading block, each partition in first-seen order. All plans are made
/// against the same parse of `lines`; the result is ordered by target line and
/// ties keep planning order, so it can be applied front to back.
pub fn plan_merge<S: AsRef<str>>(lines: &[S], batches: Vec<FileBatch>) -> Vec<Insertion> {
    let groups = parse_groups(lines);
    let present = heading_paths(lines);

    let (existing, fresh): (Vec<FileBatch>, Vec<FileBatch>) = coalesce_batches(batches)
        .into_iter()
        .partition(|batch| present.contains(&batch.path));

    let mut tail = DocumentTail::of(lines);
    let mut insertions = Vec::new();
    for batch in existing.iter().chain(fresh.iter()) {
        let planned = plan_file_merge(
            find_group(&groups, &batch.path),
            &existing_keys(&groups, &batch.path),
            batch,
            tail,
        );
        if !planned.is_empty() && !present.contains(&batch.path) {
            tail.needs_separator = true;
        }
        insertions.extend(planned);
    }

    insertions.sort_by_key(|insertion| insertion.at_line);
    tracing::debug!(
        files = existing.len() + fresh.len(),
        new_headings = fresh.len(),
        insertions = insertions.len(),
        "merge planned"
    );
    insertions
}
