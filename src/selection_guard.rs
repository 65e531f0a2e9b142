//! Selection guardian: preserving the user's selection across focus moves.
//!
//! Clicking into the chat surface would normally clear the editor's
//! selection, losing the very text the user wants the AI to edit. The
//! guardian keeps a defensive copy of the last non-collapsed selection,
//! restores it when the editor regains focus if it still resolves, and
//! intercepts blurs that target the chat surface so a live selection
//! survives the round trip.
//!
//! Selection-change notifications arrive at high frequency during drag
//! selection, so processing is throttled; skipped updates are picked up by
//! one trailing re-check after the throttle window.

use crate::document::{Document, Selection};
use std::time::{Duration, Instant};

/// Where focus moved when the editing surface was blurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    Editor,
    Chat,
    Other,
}

/// Decision for a blur event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlurDecision {
    /// Suppress the blur and keep the editor focused (selection intact).
    KeepEditorFocus,
    AllowBlur,
}

/// Result of a focus-regained restore attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored,
    NothingStored,
    /// The stored selection went stale and was discarded. Silent: this is
    /// never surfaced to the user.
    Discarded,
}

/// Tracks one optional "last known good" selection.
pub struct SelectionGuardian {
    stored: Option<Selection>,
    throttle: Duration,
    last_processed: Option<Instant>,
    /// An update arrived inside the throttle window and awaits the
    /// trailing re-check.
    trailing_check_due: bool,
}

impl SelectionGuardian {
    pub fn new(throttle: Duration) -> Self {
        Self {
            stored: None,
            throttle,
            last_processed: None,
            trailing_check_due: false,
        }
    }

    /// The currently stored selection, if any.
    pub fn stored(&self) -> Option<&Selection> {
        self.stored.as_ref()
    }

    /// Handle a selection-change notification. Throttled: at most one
    /// update per window is processed; intermediate states may be skipped
    /// as long as the final settled selection is eventually captured by
    /// `poll`.
    ///
    /// Returns true if the notification was processed now.
    pub fn on_selection_change(&mut self, doc: &Document, now: Instant) -> bool {
        if let Some(last) = self.last_processed {
            if now.duration_since(last) < self.throttle {
                self.trailing_check_due = true;
                return false;
            }
        }
        self.last_processed = Some(now);
        self.capture(doc);
        true
    }

    /// Trailing re-check: if updates were skipped during the throttle
    /// window, capture the settled selection once the window has passed.
    pub fn poll(&mut self, doc: &Document, now: Instant) -> bool {
        if !self.trailing_check_due {
            return false;
        }
        if let Some(last) = self.last_processed {
            if now.duration_since(last) < self.throttle {
                return false;
            }
        }
        self.trailing_check_due = false;
        self.last_processed = Some(now);
        self.capture(doc);
        true
    }

    /// Store a defensive copy of the active selection if it is worth
    /// re-establishing. Collapsed (cursor-only) selections are not stored.
    fn capture(&mut self, doc: &Document) {
        if let Some(selection) = doc.active_selection() {
            if !selection.is_collapsed() {
                self.stored = Some(*selection);
            }
        }
    }

    /// The editing surface regained focus: re-apply the stored selection
    /// if both endpoints still resolve, otherwise discard it silently.
    pub fn on_focus_gained(&mut self, doc: &mut Document) -> RestoreOutcome {
        let Some(selection) = self.stored else {
            return RestoreOutcome::NothingStored;
        };
        if doc.select(selection) {
            RestoreOutcome::Restored
        } else {
            tracing::debug!("stored selection went stale; discarding");
            self.stored = None;
            RestoreOutcome::Discarded
        }
    }

    /// The editing surface is losing focus. When the new target is the
    /// chat surface and the live selection still resolves, the blur is
    /// suppressed so the selection survives an "edit with AI" click.
    pub fn on_blur(&self, doc: &Document, target: FocusTarget) -> BlurDecision {
        if target != FocusTarget::Chat {
            return BlurDecision::AllowBlur;
        }
        match doc.active_selection() {
            Some(selection) if doc.resolve_selection(selection) => BlurDecision::KeepEditorFocus,
            _ => BlurDecision::AllowBlur,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Point;

    const THROTTLE: Duration = Duration::from_millis(100);

    fn selected_doc() -> Document {
        let mut doc = Document::from_paragraphs(&["some selected text"]);
        let selection = Selection::new(Point::new(0, 0, 5), Point::new(0, 0, 13));
        assert!(doc.select(selection));
        doc
    }

    #[test]
    fn test_non_collapsed_selection_is_stored() {
        let doc = selected_doc();
        let mut guard = SelectionGuardian::new(THROTTLE);
        assert!(guard.on_selection_change(&doc, Instant::now()));
        assert!(guard.stored().is_some());
    }

    #[test]
    fn test_collapsed_selection_is_not_stored() {
        let mut doc = Document::from_paragraphs(&["text"]);
        assert!(doc.select(Selection::collapsed(Point::new(0, 0, 2))));
        let mut guard = SelectionGuardian::new(THROTTLE);
        guard.on_selection_change(&doc, Instant::now());
        assert!(guard.stored().is_none());
    }

    #[test]
    fn test_throttle_skips_then_trailing_check_captures() {
        let mut doc = Document::from_paragraphs(&["drag selection target"]);
        let mut guard = SelectionGuardian::new(THROTTLE);
        let start = Instant::now();

        // First notification processes; selection is still collapsed.
        assert!(doc.select(Selection::collapsed(Point::new(0, 0, 0))));
        assert!(guard.on_selection_change(&doc, start));
        assert!(guard.stored().is_none());

        // The drag settles inside the throttle window: skipped.
        assert!(doc.select(Selection::new(
            Point::new(0, 0, 0),
            Point::new(0, 0, 4)
        )));
        assert!(!guard.on_selection_change(&doc, start + Duration::from_millis(30)));
        assert!(guard.stored().is_none());

        // Trailing re-check after the window picks up the settled state.
        assert!(!guard.poll(&doc, start + Duration::from_millis(50)));
        assert!(guard.poll(&doc, start + Duration::from_millis(150)));
        assert_eq!(
            guard.stored(),
            Some(&Selection::new(Point::new(0, 0, 0), Point::new(0, 0, 4)))
        );
    }

    #[test]
    fn test_focus_restore_reapplies_selection() {
        let mut doc = selected_doc();
        let mut guard = SelectionGuardian::new(THROTTLE);
        guard.on_selection_change(&doc, Instant::now());

        doc.clear_selection();
        assert_eq!(guard.on_focus_gained(&mut doc), RestoreOutcome::Restored);
        assert!(doc.active_selection().is_some());
    }

    #[test]
    fn test_focus_restore_discards_stale_selection_without_panic() {
        let doc = selected_doc();
        let mut guard = SelectionGuardian::new(THROTTLE);
        guard.on_selection_change(&doc, Instant::now());

        // The selected block disappears; the stored [0,0] paths no longer
        // resolve in the shrunk document.
        let mut shrunk = Document::new();
        assert_eq!(guard.on_focus_gained(&mut shrunk), RestoreOutcome::Discarded);
        assert!(guard.stored().is_none());
        assert_eq!(guard.on_focus_gained(&mut shrunk), RestoreOutcome::NothingStored);
    }

    #[test]
    fn test_blur_to_chat_keeps_focus_with_live_selection() {
        let doc = selected_doc();
        let guard = SelectionGuardian::new(THROTTLE);
        assert_eq!(
            guard.on_blur(&doc, FocusTarget::Chat),
            BlurDecision::KeepEditorFocus
        );
    }

    #[test]
    fn test_blur_elsewhere_is_allowed() {
        let doc = selected_doc();
        let guard = SelectionGuardian::new(THROTTLE);
        assert_eq!(guard.on_blur(&doc, FocusTarget::Other), BlurDecision::AllowBlur);
    }

    #[test]
    fn test_blur_to_chat_without_selection_is_allowed() {
        let mut doc = Document::from_paragraphs(&["text"]);
        doc.clear_selection();
        let guard = SelectionGuardian::new(THROTTLE);
        assert_eq!(guard.on_blur(&doc, FocusTarget::Chat), BlurDecision::AllowBlur);
    }
}
