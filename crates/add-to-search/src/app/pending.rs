//! Merges waiting for a target document to finish loading.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::domain::model::FileBatch;

/// One pending payload per document handle; a newer payload replaces an older one.
#[derive(Debug)]
pub struct PendingMerges<H> {
    slots: HashMap<H, Vec<FileBatch>>,
}

impl<H> Default for PendingMerges<H> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
        }
    }
}

impl<H: Eq + Hash + Debug> PendingMerges<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `batches` for `handle`, returning the payload it replaced.
    pub fn stash(&mut self, handle: H, batches: Vec<FileBatch>) -> Option<Vec<FileBatch>> {
        let replaced = self.slots.insert(handle, batches);
        if replaced.is_some() {
            tracing::debug!("pending merge replaced before target finished loading");
        }
        replaced
    }

    /// Remove and return the payload for `handle`.
    pub fn take(&mut self, handle: &H) -> Option<Vec<FileBatch>> {
        self.slots.remove(handle)
    }

    /// Drop the payload of a document that closed before it loaded.
    pub fn discard(&mut self, handle: &H) -> bool {
        let dropped = self.slots.remove(handle).is_some();
        if dropped {
            tracing::debug!(handle = ?handle, "discarded pending merge");
        }
        dropped
    }

    pub fn contains(&self, handle: &H) -> bool {
        self.slots.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
