//! Structured text store: the document as an ordered tree of blocks.
//!
//! A `Document` is a sequence of `Block`s (paragraphs, headings, list
//! items); each block owns a sequence of `TextRun` leaves carrying a string
//! payload and a `MarkSet` of formatting attributes. Nodes are addressed by
//! `Path`/`Point` values that are only valid against the document revision
//! they were captured at - after any committed mutation they must be
//! re-resolved, and failing to resolve is an expected condition, not an
//! error.
//!
//! All mutation goes through the methods here; every committed mutation
//! bumps `revision`, which is the only change signal consumers get (they
//! re-read whatever state they care about).

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

fn is_false(v: &bool) -> bool {
    !*v
}

/// Formatting attributes attached to a text run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkSet {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,

    /// Font family name, if one was explicitly applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

/// The smallest addressable text-bearing node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,

    #[serde(default)]
    pub marks: MarkSet,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: MarkSet::default(),
        }
    }
}

/// Structural role of a block node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading(u8),
    ListItem,
}

/// A top-level structural node of the document.
///
/// Invariant: every block holds at least one run (possibly with an empty
/// string); `Document` normalizes after structural edits to maintain this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub kind: BlockKind,
    pub runs: Vec<TextRun>,
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Paragraph,
            runs: vec![TextRun::plain(text)],
        }
    }

    /// Concatenated text of all runs in this block.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Index path from the document root to a text run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Path {
    pub block: usize,
    pub run: usize,
}

/// A position inside a text run: a path plus a byte offset into its text.
///
/// Offsets are byte offsets and must land on a `char` boundary; points that
/// do not are treated as unresolvable.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Point {
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(block: usize, run: usize, offset: usize) -> Self {
        Self {
            path: Path { block, run },
            offset,
        }
    }
}

/// A span between two points, start <= end in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRange {
    pub start: Point,
    pub end: Point,
}

impl DocRange {
    pub fn new(start: Point, end: Point) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

/// An anchor/focus pair. Unlike `DocRange`, the anchor may come after the
/// focus in document order (backward selections from drag-selecting).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// The selection as a document-ordered range.
    pub fn range(&self) -> DocRange {
        DocRange::new(self.anchor, self.focus)
    }
}

/// The document tree plus the active selection and a revision counter.
///
/// The revision is bumped on every committed mutation and doubles as the
/// change notification: there is no payload, consumers re-read state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    blocks: Vec<Block>,

    #[serde(skip)]
    revision: u64,

    #[serde(skip)]
    selection: Option<Selection>,
}

impl Document {
    /// An empty document with no blocks at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document with one plain paragraph per entry.
    pub fn from_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> Self {
        Self {
            blocks: paragraphs
                .iter()
                .map(|p| Block::paragraph(p.as_ref()))
                .collect(),
            revision: 0,
            selection: None,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    // ===== Path / point resolution =====

    /// Does this path currently exist in the tree?
    pub fn resolve_path(&self, path: Path) -> bool {
        self.blocks
            .get(path.block)
            .is_some_and(|b| path.run < b.runs.len())
    }

    /// Does this point resolve to a valid position (char boundary included)?
    pub fn resolve_point(&self, point: Point) -> bool {
        let Some(block) = self.blocks.get(point.path.block) else {
            return false;
        };
        let Some(run) = block.runs.get(point.path.run) else {
            return false;
        };
        point.offset <= run.text.len() && run.text.is_char_boundary(point.offset)
    }

    pub fn resolve_range(&self, range: DocRange) -> bool {
        self.resolve_point(range.start) && self.resolve_point(range.end)
    }

    pub fn resolve_selection(&self, selection: &Selection) -> bool {
        self.resolve_point(selection.anchor) && self.resolve_point(selection.focus)
    }

    // ===== Selection =====

    pub fn active_selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Set the active selection. Refuses (and returns false) if either
    /// endpoint does not resolve against the current tree.
    pub fn select(&mut self, selection: Selection) -> bool {
        if self.resolve_selection(&selection) {
            self.selection = Some(selection);
            true
        } else {
            false
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Install a selection without validation, to construct stale-reference
    /// scenarios in tests.
    #[cfg(test)]
    pub(crate) fn set_selection_unchecked(&mut self, selection: Selection) {
        self.selection = Some(selection);
    }

    // ===== Reads =====

    /// All text run leaves with their paths, in document order.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, Path)> + '_ {
        self.blocks.iter().enumerate().flat_map(|(b, block)| {
            block
                .runs
                .iter()
                .enumerate()
                .map(move |(r, run)| (run.text.as_str(), Path { block: b, run: r }))
        })
    }

    /// Plain text covered by a range, with `\n` at block boundaries.
    /// Returns None if the range does not resolve.
    pub fn text_in_range(&self, range: DocRange) -> Option<String> {
        if !self.resolve_range(range) {
            return None;
        }
        let (start, end) = (range.start, range.end);
        if start.path == end.path {
            let run = &self.blocks[start.path.block].runs[start.path.run];
            return Some(run.text[start.offset..end.offset].to_string());
        }
        let mut out = String::new();
        for (text, path) in self.leaves() {
            if path < start.path || path > end.path {
                continue;
            }
            if path.run == 0 && path.block > start.path.block {
                out.push('\n');
            }
            let from = if path == start.path { start.offset } else { 0 };
            let to = if path == end.path { end.offset } else { text.len() };
            out.push_str(&text[from..to]);
        }
        Some(out)
    }

    /// Full plain text of the document, blocks separated by `\n`.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&block.text());
        }
        out
    }

    /// Plain text of a single block, if it exists.
    pub fn block_text(&self, block: usize) -> Option<String> {
        self.blocks.get(block).map(|b| b.text())
    }

    /// Word count over the whole document.
    pub fn word_count(&self) -> usize {
        self.plain_text().unicode_words().count()
    }

    /// Serialized JSON snapshot of the block tree.
    pub fn serialized(&self) -> String {
        serde_json::to_string(&self.blocks).expect("block tree serializes to JSON")
    }

    /// Length in characters of the serialized snapshot, for the size guard.
    pub fn serialized_len(&self) -> usize {
        self.serialized().chars().count()
    }

    /// The last valid insertion point in the document, if any block exists.
    pub fn end_point(&self) -> Option<Point> {
        let block = self.blocks.len().checked_sub(1)?;
        let run = self.blocks[block].runs.len().checked_sub(1)?;
        let offset = self.blocks[block].runs[run].text.len();
        Some(Point::new(block, run, offset))
    }

    // ===== Mutations =====

    /// Append an empty paragraph and return the insertion point inside it.
    pub fn insert_block_at_end(&mut self) -> Point {
        self.blocks.push(Block::paragraph(""));
        self.revision += 1;
        Point::new(self.blocks.len() - 1, 0, 0)
    }

    /// Insert text at a point. Newlines in `text` split the surrounding
    /// block, carrying trailing runs into the final new block, so the
    /// block/run invariants hold for multi-line content.
    ///
    /// Returns the collapsed cursor position after the inserted text, or
    /// None if the point does not resolve. One committed mutation
    /// regardless of how many blocks the insert produces.
    pub fn insert_text(&mut self, point: Point, text: &str) -> Option<Point> {
        if !self.resolve_point(point) {
            return None;
        }
        let Path { block: b, run: r } = point.path;
        let kind = self.blocks[b].kind;
        let trailing_runs: Vec<TextRun> = self.blocks[b].runs.drain(r + 1..).collect();
        let run = &mut self.blocks[b].runs[r];
        let marks = run.marks.clone();
        let tail_text = run.text.split_off(point.offset);

        let mut segments = text.split('\n');
        let first = segments.next().unwrap_or("");
        run.text.push_str(first);
        let mut cursor = Point::new(b, r, point.offset + first.len());

        let mut insert_at = b + 1;
        for segment in segments {
            self.blocks.insert(
                insert_at,
                Block {
                    kind,
                    runs: vec![TextRun {
                        text: segment.to_string(),
                        marks: marks.clone(),
                    }],
                },
            );
            cursor = Point::new(insert_at, 0, segment.len());
            insert_at += 1;
        }

        // Reattach whatever followed the insertion point to the last block
        // the insert touched.
        let last = &mut self.blocks[cursor.path.block];
        last.runs[cursor.path.run].text.push_str(&tail_text);
        last.runs.extend(trailing_runs);

        self.revision += 1;
        self.selection = Some(Selection::collapsed(cursor));
        Some(cursor)
    }

    /// Split the block at a point, starting a new block of the same kind.
    /// Returns the insertion point at the start of the new block.
    pub fn split_block(&mut self, point: Point) -> Option<Point> {
        self.insert_text(point, "\n")
    }

    /// Delete the text covered by a range, merging blocks where the range
    /// crosses block boundaries. Collapses the selection to the deletion
    /// start. Returns false if the range does not resolve.
    pub fn delete_range(&mut self, range: DocRange) -> bool {
        if !self.resolve_range(range) {
            return false;
        }
        let (start, end) = (range.start, range.end);
        if start == end {
            self.selection = Some(Selection::collapsed(start));
            return true;
        }

        if start.path == end.path {
            let run = &mut self.blocks[start.path.block].runs[start.path.run];
            run.text.replace_range(start.offset..end.offset, "");
        } else if start.path.block == end.path.block {
            let block = &mut self.blocks[start.path.block];
            block.runs[start.path.run].text.truncate(start.offset);
            let kept_tail = block.runs[end.path.run].text.split_off(end.offset);
            block.runs[end.path.run].text = kept_tail;
            block.runs.drain(start.path.run + 1..end.path.run);
        } else {
            // Cross-block: truncate the start block at the start point, trim
            // the end block to what survives after the end point, drop
            // everything in between, then merge the survivors.
            let survivors: Vec<TextRun> = {
                let end_block = &mut self.blocks[end.path.block];
                let kept_tail = end_block.runs[end.path.run].text.split_off(end.offset);
                end_block.runs[end.path.run].text = kept_tail;
                end_block.runs.drain(end.path.run..).collect()
            };
            let start_block = &mut self.blocks[start.path.block];
            start_block.runs[start.path.run].text.truncate(start.offset);
            start_block.runs.truncate(start.path.run + 1);
            start_block.runs.extend(survivors);
            self.blocks.drain(start.path.block + 1..=end.path.block);
        }

        self.normalize();
        self.revision += 1;
        self.selection = Some(Selection::collapsed(start));
        true
    }

    /// Replace the text covered by a range with new text, as one committed
    /// mutation pair. Cursor lands after the replacement.
    pub fn replace_range(&mut self, range: DocRange, text: &str) -> Option<Point> {
        if !self.delete_range(range) {
            return None;
        }
        self.insert_text(range.start, text)
    }

    /// Restore the block invariant after structural edits: every block
    /// keeps at least one run.
    fn normalize(&mut self) {
        for block in &mut self.blocks {
            if block.runs.is_empty() {
                block.runs.push(TextRun::plain(""));
            }
        }
    }
}
