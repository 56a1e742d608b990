//! Command gating and the merge flow against an editor host.

use std::fmt::Debug;
use std::hash::Hash;
use std::ops::Range;

use anyhow::Result;

use crate::app::apply::{AppliedMerge, TextBuffer, apply_insertions};
use crate::app::document::split_lines;
use crate::app::merge::plan_merge;
use crate::app::pending::PendingMerges;
use crate::app::selection::{LineSelection, batch_from_source, batches_from_document, is_aggregation};
use crate::app::settings::ProjectSettings;
use crate::domain::errors::DomainError;
use crate::domain::model::{FileBatch, Insertion};

/// Result of asking the host to open a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedDocument<H> {
    pub handle: H,
    /// The document is still loading; its contents are not available yet.
    pub loading: bool,
}

/// Editor capabilities the merge flow relies on.
pub trait EditorHost {
    type Handle: Clone + Eq + Hash + Debug;
    type Buffer: TextBuffer;

    /// Open the document at `path`, or return the already open one.
    fn open(&mut self, path: &str) -> Result<OpenedDocument<Self::Handle>>;

    /// Editable buffer of a loaded document.
    fn buffer_mut(&mut self, handle: &Self::Handle) -> Result<&mut Self::Buffer>;

    /// Replace the document's selection with `ranges`.
    fn select(&mut self, _handle: &Self::Handle, _ranges: &[Range<usize>]) -> Result<()> {
        Ok(())
    }
}

/// The document a merge command was invoked from.
#[derive(Debug, Clone, Copy)]
pub struct SourceView<'a> {
    pub path: Option<&'a str>,
    pub text: &'a str,
    pub selection: &'a LineSelection,
    /// The host already renders this view as an aggregation document.
    pub aggregation_syntax: bool,
}

impl SourceView<'_> {
    pub fn is_aggregation(&self, extension: &str) -> bool {
        self.aggregation_syntax || self.path.is_some_and(|path| is_aggregation(path, extension))
    }
}

/// Make `path` the project's target aggregation document.
pub fn use_target(
    settings: &mut ProjectSettings,
    path: &str,
    extension: &str,
) -> Result<(), DomainError> {
    if !is_aggregation(path, extension) {
        return Err(DomainError::NotAnAggregation(path.to_owned()));
    }
    settings.set_add_to(path);
    Ok(())
}

/// The configured target, if any.
pub fn open_target(settings: &ProjectSettings) -> Result<&str, DomainError> {
    settings.add_to().ok_or(DomainError::NoTarget)
}

/// Check whether `source` can be merged into the configured target.
pub fn check_add<'s>(
    source: &SourceView<'_>,
    settings: &'s ProjectSettings,
    extension: &str,
) -> Result<&'s str, DomainError> {
    if source.path.is_none() && !source.is_aggregation(extension) {
        return Err(DomainError::MissingSourcePath);
    }
    let target = settings.add_to().ok_or(DomainError::NoTarget)?;
    if source.path == Some(target) {
        return Err(DomainError::TargetIsSource);
    }
    Ok(target)
}

/// Turn the source's selection into merge batches.
pub fn capture(source: &SourceView<'_>, extension: &str) -> Result<Vec<FileBatch>, DomainError> {
    let batches = if source.is_aggregation(extension) {
        batches_from_document(&split_lines(source.text), source.selection)
    } else {
        let path = source.path.ok_or(DomainError::MissingSourcePath)?;
        vec![batch_from_source(path, source.text, source.selection)]
    };

    if batches.iter().all(FileBatch::is_empty) {
        return Err(DomainError::EmptySelection);
    }
    Ok(batches)
}

/// Plan a merge of `batches` into the current contents of `text`.
pub fn plan_for(text: &str, batches: Vec<FileBatch>) -> Vec<Insertion> {
    plan_merge(&split_lines(text), batches)
}

/// Parse `buffer`, plan the merge, and write it.
pub fn merge_into<B: TextBuffer + ?Sized>(
    buffer: &mut B,
    batches: Vec<FileBatch>,
) -> Result<AppliedMerge> {
    let insertions = plan_for(buffer.text(), batches);
    apply_insertions(buffer, &insertions)
}

/// What happened to an add request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Applied(AppliedMerge),
    /// Parked until the target finishes loading.
    Deferred { replaced: bool },
    /// The command was not applicable; nothing changed.
    Skipped(DomainError),
}

/// Runs merges against a host, parking them while targets load.
#[derive(Debug)]
pub struct MergeController<K> {
    pending: PendingMerges<K>,
    select_inserted: bool,
}

impl<K: Clone + Eq + Hash + Debug> MergeController<K> {
    pub fn new(select_inserted: bool) -> Self {
        Self {
            pending: PendingMerges::new(),
            select_inserted,
        }
    }

    /// Merges waiting on a load.
    pub fn pending(&self) -> &PendingMerges<K> {
        &self.pending
    }

    /// Gate, capture, and merge the selection of `source` into the configured target.
    pub fn add_selection<H: EditorHost<Handle = K>>(
        &mut self,
        host: &mut H,
        settings: &ProjectSettings,
        source: &SourceView<'_>,
        extension: &str,
    ) -> Result<AddOutcome> {
        let target = match check_add(source, settings, extension) {
            Ok(target) => target,
            Err(reason) => return Ok(skipped(reason)),
        };
        let batches = match capture(source, extension) {
            Ok(batches) => batches,
            Err(reason) => return Ok(skipped(reason)),
        };
        self.add(host, target, batches)
    }

    /// Merge `batches` into the document at `target`.
    pub fn add<H: EditorHost<Handle = K>>(
        &mut self,
        host: &mut H,
        target: &str,
        batches: Vec<FileBatch>,
    ) -> Result<AddOutcome> {
        let opened = host.open(target)?;
        if opened.loading {
            let replaced = self.pending.stash(opened.handle, batches).is_some();
            tracing::info!(document = %target, "target still loading; merge deferred");
            return Ok(AddOutcome::Deferred { replaced });
        }

        let applied = self.apply(host, &opened.handle, batches)?;
        tracing::info!(document = %target, inserted = applied.inserted, "merged into target");
        Ok(AddOutcome::Applied(applied))
    }

    /// Apply the merge parked for `handle`, if any.
    pub fn on_loaded<H: EditorHost<Handle = K>>(
        &mut self,
        host: &mut H,
        handle: &K,
    ) -> Result<Option<AppliedMerge>> {
        let Some(batches) = self.pending.take(handle) else {
            return Ok(None);
        };
        self.apply(host, handle, batches).map(Some)
    }

    /// Forget the merge parked for a document that closed before loading.
    pub fn on_closed(&mut self, handle: &K) -> bool {
        self.pending.discard(handle)
    }

    fn apply<H: EditorHost<Handle = K>>(
        &mut self,
        host: &mut H,
        handle: &K,
        batches: Vec<FileBatch>,
    ) -> Result<AppliedMerge> {
        let applied = merge_into(host.buffer_mut(handle)?, batches)?;
        if self.select_inserted && !applied.selections.is_empty() {
            host.select(handle, &applied.selections)?;
        }
        Ok(applied)
    }
}

fn skipped(reason: DomainError) -> AddOutcome {
    tracing::debug!(%reason, "add skipped");
    AddOutcome::Skipped(reason)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::anyhow;

    use super::*;
    use crate::app::settings::ProjectData;
    use crate::domain::model::SourceEntry;

    #[derive(Default)]
    struct FakeHost {
        docs: HashMap<String, String>,
        loading: Vec<String>,
        selected: Vec<Range<usize>>,
    }

    impl EditorHost for FakeHost {
        type Handle = String;
        type Buffer = String;

        fn open(&mut self, path: &str) -> Result<OpenedDocument<String>> {
            self.docs.entry(path.to_owned()).or_default();
            Ok(OpenedDocument {
                handle: path.to_owned(),
                loading: self.loading.iter().any(|p| p == path),
            })
        }

        fn buffer_mut(&mut self, handle: &String) -> Result<&mut String> {
            self.docs
                .get_mut(handle)
                .ok_or_else(|| anyhow!("unknown document {handle}"))
        }

        fn select(&mut self, _handle: &String, ranges: &[Range<usize>]) -> Result<()> {
            self.selected = ranges.to_vec();
            Ok(())
        }
    }

    fn settings_with_target(target: &str) -> ProjectSettings {
        let mut settings = ProjectSettings::read(&ProjectData::default());
        settings.set_add_to(target);
        settings
    }

    #[test]
    fn use_target_requires_aggregation_extension() {
        let mut settings = ProjectSettings::default();
        assert_eq!(
            use_target(&mut settings, "/notes.txt", ".search"),
            Err(DomainError::NotAnAggregation("/notes.txt".into()))
        );
        assert_eq!(open_target(&settings), Err(DomainError::NoTarget));

        use_target(&mut settings, "/notes.search", ".search").unwrap();
        assert_eq!(open_target(&settings), Ok("/notes.search"));
    }

    #[test]
    fn add_is_gated() {
        let selection = LineSelection::whole(1);
        let untitled = SourceView {
            path: None,
            text: "x",
            selection: &selection,
            aggregation_syntax: false,
        };
        let settings = settings_with_target("/t.search");
        assert_eq!(
            check_add(&untitled, &settings, ".search"),
            Err(DomainError::MissingSourcePath)
        );

        let source = SourceView {
            path: Some("/src/a.rs"),
            ..untitled
        };
        assert_eq!(
            check_add(&source, &ProjectSettings::default(), ".search"),
            Err(DomainError::NoTarget)
        );

        let target_itself = SourceView {
            path: Some("/t.search"),
            ..untitled
        };
        assert_eq!(
            check_add(&target_itself, &settings, ".search"),
            Err(DomainError::TargetIsSource)
        );
        assert_eq!(check_add(&source, &settings, ".search"), Ok("/t.search"));
    }

    #[test]
    fn capture_reports_empty_selection() {
        let selection = LineSelection::new();
        let source = SourceView {
            path: Some("/src/a.rs"),
            text: "x\n",
            selection: &selection,
            aggregation_syntax: false,
        };
        assert_eq!(capture(&source, ".search"), Err(DomainError::EmptySelection));
    }

    #[test]
    fn add_selection_merges_and_selects() -> Result<()> {
        let mut host = FakeHost::default();
        let settings = settings_with_target("/t.search");
        let mut selection = LineSelection::new();
        selection.add_line(1);
        let source = SourceView {
            path: Some("/src/a.rs"),
            text: "fn a() {}\nfn b() {}\n",
            selection: &selection,
            aggregation_syntax: false,
        };

        let mut controller = MergeController::new(true);
        let outcome = controller.add_selection(&mut host, &settings, &source, ".search")?;
        assert!(matches!(outcome, AddOutcome::Applied(ref applied) if applied.inserted == 2));
        assert_eq!(host.docs["/t.search"], "/src/a.rs:\n    2: fn b() {}\n");
        assert_eq!(host.selected, vec![0..10, 11..27]);

        let again = controller.add_selection(&mut host, &settings, &source, ".search")?;
        assert_eq!(again, AddOutcome::Applied(AppliedMerge::default()));
        assert_eq!(host.docs["/t.search"], "/src/a.rs:\n    2: fn b() {}\n");
        Ok(())
    }

    #[test]
    fn add_selection_skips_when_gated() -> Result<()> {
        let mut host = FakeHost::default();
        let selection = LineSelection::whole(1);
        let source = SourceView {
            path: Some("/src/a.rs"),
            text: "x",
            selection: &selection,
            aggregation_syntax: false,
        };
        let mut controller = MergeController::new(true);
        let outcome =
            controller.add_selection(&mut host, &ProjectSettings::default(), &source, ".search")?;
        assert_eq!(outcome, AddOutcome::Skipped(DomainError::NoTarget));
        assert!(host.docs.is_empty());
        Ok(())
    }

    #[test]
    fn loading_target_defers_until_loaded_with_last_writer_winning() -> Result<()> {
        let mut host = FakeHost {
            loading: vec!["/t.search".into()],
            ..FakeHost::default()
        };
        let mut controller = MergeController::new(false);
        let first = vec![FileBatch::new("/a", vec![SourceEntry::new(0, "first")])];
        let second = vec![FileBatch::new("/a", vec![SourceEntry::new(0, "second")])];

        assert_eq!(
            controller.add(&mut host, "/t.search", first)?,
            AddOutcome::Deferred { replaced: false }
        );
        assert_eq!(
            controller.add(&mut host, "/t.search", second)?,
            AddOutcome::Deferred { replaced: true }
        );
        assert!(host.docs["/t.search"].is_empty());

        let handle = "/t.search".to_owned();
        let applied = controller.on_loaded(&mut host, &handle)?.unwrap();
        assert_eq!(applied.inserted, 2);
        assert_eq!(host.docs["/t.search"], "/a:\n    1: second\n");
        assert!(host.selected.is_empty());
        assert!(controller.on_loaded(&mut host, &handle)?.is_none());
        Ok(())
    }

    #[test]
    fn closing_before_load_discards_pending_merge() -> Result<()> {
        let mut host = FakeHost {
            loading: vec!["/t.search".into()],
            ..FakeHost::default()
        };
        let mut controller = MergeController::new(true);
        controller.add(
            &mut host,
            "/t.search",
            vec![FileBatch::new("/a", vec![SourceEntry::new(0, "x")])],
        )?;
        assert!(controller.on_closed(&"/t.search".to_owned()));
        assert!(controller.pending().is_empty());
        Ok(())
    }

    #[test]
    fn reaggregating_from_another_aggregation_document() -> Result<()> {
        let mut host = FakeHost::default();
        host.docs.insert("/t.search".into(), "/a.txt:\n    1: one\n".into());
        let settings = settings_with_target("/t.search");
        let mut selection = LineSelection::new();
        selection.add_range(0, 2);
        let source = SourceView {
            path: Some("/other.search"),
            text: "/a.txt:\n    1: one\n    3: three\n",
            selection: &selection,
            aggregation_syntax: false,
        };

        let mut controller = MergeController::new(true);
        controller.add_selection(&mut host, &settings, &source, ".search")?;
        assert_eq!(host.docs["/t.search"], "/a.txt:\n    1: one\n    3: three\n");
        Ok(())
    }
}
