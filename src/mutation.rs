//! Mutation applier: executing located edits and writes safely.
//!
//! Commands arrive after an asynchronous AI round-trip, so the document
//! may have changed since they were issued. Every entry point here treats
//! stale selections and unlocatable targets as expected conditions: the
//! operation degrades (falls back to end-of-document insertion) or refuses
//! (reports not-found) but never corrupts the tree or panics.
//!
//! After every committed mutation the `DocumentContext` is re-derived and
//! published - that is the only way downstream AI turns observe the new
//! state.

use crate::context::{ContextStore, FormatState};
use crate::document::{Document, Point, Selection};
use crate::error::CoreError;
use crate::locator::locate;

/// Result of applying an edit command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// `old_text` equals `new_text`; the document is untouched.
    NoOp,
    NotFound,
}

/// Result of applying a write command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    SizeLimitExceeded { len: usize, limit: usize },
}

/// Executes edit/write mutations against the document. Owns the explicit
/// formatting state (what the next typed character would look like) and
/// the serialized-size guard.
pub struct MutationApplier {
    size_limit: usize,
    format: FormatState,
}

impl MutationApplier {
    pub fn new(size_limit: usize) -> Self {
        Self {
            size_limit,
            format: FormatState::default(),
        }
    }

    pub fn format(&self) -> &FormatState {
        &self.format
    }

    pub fn format_mut(&mut self) -> &mut FormatState {
        &mut self.format
    }

    pub fn size_limit(&self) -> usize {
        self.size_limit
    }

    /// Would a write be refused right now?
    pub fn check_size_guard(&self, doc: &Document) -> Result<(), CoreError> {
        let len = doc.serialized_len();
        if len > self.size_limit {
            Err(CoreError::SizeLimit {
                len,
                limit: self.size_limit,
            })
        } else {
            Ok(())
        }
    }

    /// Replace the first occurrence of `old_text` with `new_text`.
    ///
    /// Atomic from the caller's perspective: either the full old-text span
    /// is replaced or nothing changes. Republishes the context only on an
    /// actual mutation.
    pub fn apply_edit(
        &self,
        doc: &mut Document,
        ctx: &mut ContextStore,
        old_text: &str,
        new_text: &str,
    ) -> EditOutcome {
        if old_text == new_text {
            return EditOutcome::NoOp;
        }
        let Some(range) = locate(doc, old_text) else {
            tracing::debug!(old_text, "edit target not found");
            return EditOutcome::NotFound;
        };
        doc.select(Selection::new(range.start, range.end));
        if doc.replace_range(range, new_text).is_none() {
            // locate() just produced this range against the same tree, so
            // it must resolve; treat anything else as not-found.
            tracing::warn!(old_text, "located range failed to resolve");
            return EditOutcome::NotFound;
        }
        ctx.republish(doc, &self.format);
        tracing::info!(old_text, new_text, "applied edit");
        EditOutcome::Applied
    }

    /// Insert `content` in one operation, with replace-selection semantics.
    pub fn apply_write(
        &self,
        doc: &mut Document,
        ctx: &mut ContextStore,
        content: &str,
    ) -> WriteOutcome {
        if let Err(CoreError::SizeLimit { len, limit }) = self.check_size_guard(doc) {
            tracing::warn!(len, limit, "write refused by size guard");
            return WriteOutcome::SizeLimitExceeded { len, limit };
        }
        let point = prepare_insertion(doc);
        // The point came from the live tree a moment ago; insert_text only
        // refuses if it no longer resolves, which cannot happen between
        // these two single-threaded statements.
        doc.insert_text(point, content);
        ctx.republish(doc, &self.format);
        tracing::info!(chars = content.len(), "applied write");
        WriteOutcome::Applied
    }

    /// Replace a previously captured selection's range with new text, for
    /// the selection-scoped "edit with AI" flow. Returns false when the
    /// selection no longer resolves (the document moved on); the document
    /// is untouched in that case.
    pub fn apply_selection_edit(
        &self,
        doc: &mut Document,
        ctx: &mut ContextStore,
        selection: &Selection,
        replacement: &str,
    ) -> bool {
        if !doc.resolve_selection(selection) {
            tracing::debug!("selection edit dropped: stale selection");
            return false;
        }
        let range = selection.range();
        if doc.replace_range(range, replacement).is_none() {
            return false;
        }
        ctx.republish(doc, &self.format);
        true
    }
}

/// Normalize the document to a valid insertion point for a write:
///
/// - a live non-collapsed selection is deleted first (replace-selection);
/// - a stale selection is cleared and treated as no selection;
/// - an empty document gets an empty paragraph so an insertion point
///   exists;
/// - with no selection, the insertion point is the end of the document.
pub fn prepare_insertion(doc: &mut Document) -> Point {
    if let Some(selection) = doc.active_selection().copied() {
        if doc.resolve_selection(&selection) {
            if !selection.is_collapsed() {
                let range = selection.range();
                doc.delete_range(range);
                return range.start;
            }
            return selection.anchor;
        }
        tracing::debug!("stale selection cleared before write");
        doc.clear_selection();
    }
    match doc.end_point() {
        Some(point) => point,
        None => doc.insert_block_at_end(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Point;

    fn setup(paragraphs: &[&str]) -> (Document, ContextStore, MutationApplier) {
        (
            Document::from_paragraphs(paragraphs),
            ContextStore::new("Untitled Document"),
            MutationApplier::new(1000),
        )
    }

    #[test]
    fn test_apply_edit_round_trip() {
        let (mut doc, mut ctx, applier) = setup(&["This is a draft.", "untouched"]);
        let outcome = applier.apply_edit(&mut doc, &mut ctx, "draft", "final");
        assert_eq!(outcome, EditOutcome::Applied);
        assert_eq!(doc.block_text(0).unwrap(), "This is a final.");
        assert_eq!(doc.block_text(1).unwrap(), "untouched");
        assert_eq!(ctx.context().total_words, 5);
    }

    #[test]
    fn test_apply_edit_noop_never_mutates() {
        let (mut doc, mut ctx, applier) = setup(&["same text"]);
        let revision = doc.revision();
        let outcome = applier.apply_edit(&mut doc, &mut ctx, "same", "same");
        assert_eq!(outcome, EditOutcome::NoOp);
        assert_eq!(doc.revision(), revision);
    }

    #[test]
    fn test_apply_edit_not_found_leaves_document_untouched() {
        let (mut doc, mut ctx, applier) = setup(&["hello"]);
        let revision = doc.revision();
        let outcome = applier.apply_edit(&mut doc, &mut ctx, "missing", "x");
        assert_eq!(outcome, EditOutcome::NotFound);
        assert_eq!(doc.revision(), revision);
        assert_eq!(doc.plain_text(), "hello");
    }

    #[test]
    fn test_apply_write_at_document_end() {
        let (mut doc, mut ctx, applier) = setup(&["start"]);
        let outcome = applier.apply_write(&mut doc, &mut ctx, " and more");
        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(doc.plain_text(), "start and more");
        assert_eq!(ctx.context().total_words, 3);
    }

    #[test]
    fn test_apply_write_seeds_empty_document() {
        let mut doc = Document::new();
        let mut ctx = ContextStore::new("Untitled Document");
        let applier = MutationApplier::new(1000);
        let outcome = applier.apply_write(&mut doc, &mut ctx, "hello world");
        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(doc.plain_text(), "hello world");
        assert_eq!(doc.blocks().len(), 1);
    }

    #[test]
    fn test_apply_write_replaces_selection() {
        let (mut doc, mut ctx, applier) = setup(&["keep REPLACE keep"]);
        let selection = Selection::new(Point::new(0, 0, 5), Point::new(0, 0, 12));
        assert!(doc.select(selection));
        applier.apply_write(&mut doc, &mut ctx, "NEW");
        assert_eq!(doc.plain_text(), "keep NEW keep");
    }

    #[test]
    fn test_apply_write_with_stale_selection_falls_through_to_end() {
        let (mut doc, mut ctx, applier) = setup(&["one"]);
        // A selection whose paths no longer exist in the tree.
        doc.set_selection_unchecked(Selection::new(Point::new(5, 0, 0), Point::new(5, 0, 1)));
        let outcome = applier.apply_write(&mut doc, &mut ctx, "!");
        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(doc.plain_text(), "one!");
        assert!(doc.active_selection().is_some_and(|s| doc.resolve_selection(s)));
    }

    #[test]
    fn test_size_guard_refuses_oversized_write() {
        let big = "x".repeat(1200);
        let (mut doc, mut ctx, applier) = setup(&[big.as_str()]);
        let revision = doc.revision();
        let outcome = applier.apply_write(&mut doc, &mut ctx, "more");
        assert!(matches!(outcome, WriteOutcome::SizeLimitExceeded { .. }));
        assert_eq!(doc.revision(), revision);
    }

    #[test]
    fn test_apply_selection_edit_stale_is_noop() {
        let (mut doc, mut ctx, applier) = setup(&["short"]);
        let stale = Selection::new(Point::new(2, 0, 0), Point::new(2, 0, 3));
        assert!(!applier.apply_selection_edit(&mut doc, &mut ctx, &stale, "x"));
        assert_eq!(doc.plain_text(), "short");
    }

    #[test]
    fn test_apply_selection_edit_replaces_range() {
        let (mut doc, mut ctx, applier) = setup(&["make this better"]);
        let selection = Selection::new(Point::new(0, 0, 5), Point::new(0, 0, 9));
        assert!(applier.apply_selection_edit(&mut doc, &mut ctx, &selection, "that"));
        assert_eq!(doc.plain_text(), "make that better");
    }
}
