//! Locator: finding an edit target inside the document tree.
//!
//! Given the `old_text` of an edit command, `locate` finds where it lives.
//! The document may have changed since the command was issued, so this is
//! always a fresh search against the live tree, and coming up empty is an
//! expected outcome.
//!
//! Matching is intra-leaf only: text that spans a formatting boundary
//! (e.g. a phrase that is partially bold, and therefore split across two
//! runs) will not be found. That limitation is deliberate.

use crate::document::{DocRange, Document, Point};

/// Find the first occurrence of `old_text` in the document.
///
/// Search order:
/// 1. If a live, non-collapsed selection exists and its resolved text
///    contains `old_text`, the search is confined to the selection.
/// 2. Otherwise every text run leaf is scanned in document order and the
///    first leaf containing `old_text` as a contiguous substring wins.
///
/// Returns the minimal range covering exactly the matched substring, or
/// None. Ties always go to the first match in document order; there is no
/// ranking. Pure function: no mutation, no side effects.
pub fn locate(doc: &Document, old_text: &str) -> Option<DocRange> {
    if old_text.is_empty() {
        return None;
    }

    if let Some(selection) = doc.active_selection() {
        if !selection.is_collapsed() {
            let range = selection.range();
            if let Some(selected) = doc.text_in_range(range) {
                if selected.contains(old_text) {
                    return locate_within(doc, range, old_text);
                }
            }
        }
    }

    for (text, path) in doc.leaves() {
        if let Some(byte) = text.find(old_text) {
            return Some(DocRange::new(
                Point { path, offset: byte },
                Point {
                    path,
                    offset: byte + old_text.len(),
                },
            ));
        }
    }
    None
}

/// Scan only the leaves intersecting `range`, respecting its boundary
/// offsets within the first and last leaf. Still intra-leaf matching: the
/// selection's combined text may contain `old_text` across a leaf boundary
/// without any single leaf containing it, in which case this finds nothing.
fn locate_within(doc: &Document, range: DocRange, old_text: &str) -> Option<DocRange> {
    for (text, path) in doc.leaves() {
        if path < range.start.path || path > range.end.path {
            continue;
        }
        let from = if path == range.start.path {
            range.start.offset
        } else {
            0
        };
        let to = if path == range.end.path {
            range.end.offset
        } else {
            text.len()
        };
        if let Some(byte) = text[from..to].find(old_text) {
            let offset = from + byte;
            return Some(DocRange::new(
                Point { path, offset },
                Point {
                    path,
                    offset: offset + old_text.len(),
                },
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Point, Selection};

    #[test]
    fn test_locate_simple_substring() {
        let doc = Document::from_paragraphs(&["This is a draft."]);
        let range = locate(&doc, "draft").unwrap();
        assert_eq!(range.start, Point::new(0, 0, 10));
        assert_eq!(range.end, Point::new(0, 0, 15));
        assert_eq!(doc.text_in_range(range).unwrap(), "draft");
    }

    #[test]
    fn test_locate_first_match_in_document_order() {
        let doc = Document::from_paragraphs(&["has dup here", "another dup here"]);
        let range = locate(&doc, "dup").unwrap();
        assert_eq!(range.start.path.block, 0);
    }

    #[test]
    fn test_locate_missing_text() {
        let doc = Document::from_paragraphs(&["nothing to see"]);
        assert!(locate(&doc, "absent").is_none());
    }

    #[test]
    fn test_locate_empty_needle() {
        let doc = Document::from_paragraphs(&["text"]);
        assert!(locate(&doc, "").is_none());
    }

    #[test]
    fn test_locate_prefers_selection() {
        let mut doc = Document::from_paragraphs(&["dup early", "select dup here"]);
        let selection = Selection::new(Point::new(1, 0, 0), Point::new(1, 0, 15));
        assert!(doc.select(selection));
        let range = locate(&doc, "dup").unwrap();
        assert_eq!(range.start.path.block, 1);
        assert_eq!(range.start.offset, 7);
    }

    #[test]
    fn test_locate_selection_without_match_falls_back_to_scan() {
        let mut doc = Document::from_paragraphs(&["target text", "selected words"]);
        let selection = Selection::new(Point::new(1, 0, 0), Point::new(1, 0, 14));
        assert!(doc.select(selection));
        let range = locate(&doc, "target").unwrap();
        assert_eq!(range.start.path.block, 0);
    }

    #[test]
    fn test_locate_respects_selection_boundaries() {
        // "dup" exists before the selection start within the same leaf; the
        // confined search must find the occurrence inside the selection.
        let mut doc = Document::from_paragraphs(&["dup and dup again"]);
        let selection = Selection::new(Point::new(0, 0, 4), Point::new(0, 0, 17));
        assert!(doc.select(selection));
        let range = locate(&doc, "dup").unwrap();
        assert_eq!(range.start.offset, 8);
    }

    #[test]
    fn test_locate_is_pure() {
        let doc = Document::from_paragraphs(&["some text"]);
        let revision = doc.revision();
        let _ = locate(&doc, "text");
        assert_eq!(doc.revision(), revision);
    }
}
