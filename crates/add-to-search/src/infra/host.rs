//! File-backed documents and an editor host over the local file system.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::app::apply::TextBuffer;
use crate::app::commands::{EditorHost, OpenedDocument};

/// A text file held in memory until saved.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    contents: String,
    dirty: bool,
}

impl Document {
    /// Read the file at `path`. A missing file opens as an empty document.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "document does not exist yet");
                String::new()
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read document {}", path.display()));
            }
        };
        Ok(Self {
            path,
            contents,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write pending changes back to disk. Returns whether anything was written.
    pub fn save(&mut self) -> Result<bool> {
        if !self.dirty {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create document directory {}", parent.display())
            })?;
        }
        fs::write(&self.path, &self.contents)
            .with_context(|| format!("failed to write document {}", self.path.display()))?;
        self.dirty = false;
        tracing::info!(path = %self.path.display(), "saved document");
        Ok(true)
    }
}

impl TextBuffer for Document {
    fn text(&self) -> &str {
        &self.contents
    }

    fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        TextBuffer::insert(&mut self.contents, offset, text)?;
        self.dirty = true;
        Ok(())
    }
}

/// Editor host whose documents load synchronously from disk.
#[derive(Debug, Default)]
pub struct FsHost {
    documents: HashMap<PathBuf, Document>,
    selections: HashMap<PathBuf, Vec<Range<usize>>>,
}

impl FsHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self, path: &Path) -> Option<&Document> {
        self.documents.get(path)
    }

    /// Last selection placed in the document at `path`.
    pub fn selection(&self, path: &Path) -> &[Range<usize>] {
        self.selections
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Save every modified document, returning how many were written.
    pub fn save_all(&mut self) -> Result<usize> {
        let mut written = 0;
        for document in self.documents.values_mut() {
            if document.save()? {
                written += 1;
            }
        }
        Ok(written)
    }
}

impl EditorHost for FsHost {
    type Handle = PathBuf;
    type Buffer = Document;

    fn open(&mut self, path: &str) -> Result<OpenedDocument<PathBuf>> {
        let handle = PathBuf::from(path);
        if !self.documents.contains_key(&handle) {
            let document = Document::open(&handle)?;
            self.documents.insert(handle.clone(), document);
        }
        Ok(OpenedDocument {
            handle,
            loading: false,
        })
    }

    fn buffer_mut(&mut self, handle: &PathBuf) -> Result<&mut Document> {
        self.documents
            .get_mut(handle)
            .ok_or_else(|| anyhow!("document {} is not open", handle.display()))
    }

    fn select(&mut self, handle: &PathBuf, ranges: &[Range<usize>]) -> Result<()> {
        self.selections.insert(handle.clone(), ranges.to_vec());
        Ok(())
    }
}
