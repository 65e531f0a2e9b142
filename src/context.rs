//! Context projection: the derived read-model of document state that the
//! AI-facing layer consumes.
//!
//! `DocumentContext` is a read-mostly snapshot recomputed after every
//! committed mutation and replaced wholesale - it is never mutated in
//! place, so consumers either see the previous fully-committed state or
//! the next one, never a mid-mutation hybrid. The `ContextStore` is its
//! single owner; the editor mutation pipeline writes it, everyone else
//! reads.

use crate::document::Document;
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Current formatting state at the cursor. Owned by the mutation pipeline
/// and snapshotted into the context, not hung off the document tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<String>,
}

/// Snapshot of document state attached to every outbound AI request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Text covered by the active selection, empty when collapsed or none.
    pub selected_text: String,

    /// Plain text of the block containing the selection focus.
    pub current_paragraph: String,

    pub total_words: usize,

    /// Serialized JSON snapshot of the whole block tree.
    pub full_content: String,

    pub document_title: String,

    pub last_edit: DateTime<Utc>,

    pub current_format: FormatState,
}

impl DocumentContext {
    fn empty(title: &str) -> Self {
        Self {
            selected_text: String::new(),
            current_paragraph: String::new(),
            total_words: 0,
            full_content: "[]".to_string(),
            document_title: title.to_string(),
            last_edit: Utc::now(),
            current_format: FormatState::default(),
        }
    }
}

/// Single owner of the current `DocumentContext`.
pub struct ContextStore {
    current: DocumentContext,
    title: String,
}

impl ContextStore {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            current: DocumentContext::empty(&title),
            title,
        }
    }

    pub fn context(&self) -> &DocumentContext {
        &self.current
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.current.document_title = self.title.clone();
    }

    /// Re-derive the context from the live document and publish it,
    /// replacing the previous snapshot wholesale. Called strictly after
    /// the mutation that produced the new state.
    pub fn republish(&mut self, doc: &Document, format: &FormatState) {
        let selected_text = doc
            .active_selection()
            .filter(|s| !s.is_collapsed())
            .and_then(|s| doc.text_in_range(s.range()))
            .unwrap_or_default();
        let current_paragraph = doc
            .active_selection()
            .and_then(|s| doc.block_text(s.focus.path.block))
            .unwrap_or_default();

        self.current = DocumentContext {
            selected_text,
            current_paragraph,
            total_words: doc.word_count(),
            full_content: doc.serialized(),
            document_title: self.title.clone(),
            last_edit: Utc::now(),
            current_format: format.clone(),
        };
    }
}

/// Invalidation key for cached context prompts: coarse enough that small
/// cursor movements reuse the cache, precise enough that any content
/// change misses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextKey {
    pub title: String,
    pub total_words: usize,
}

impl ContextKey {
    pub fn of(context: &DocumentContext) -> Self {
        Self {
            title: context.document_title.clone(),
            total_words: context.total_words,
        }
    }
}

/// Explicit cache for rendered context prompts, keyed by `ContextKey`.
/// Injected where needed so lifetime and invalidation are testable; this
/// replaces any ambient module-level caching.
pub struct ContextCache {
    entries: LruCache<ContextKey, String>,
}

impl ContextCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("clamped above zero");
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn get(&mut self, key: &ContextKey) -> Option<&String> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: ContextKey, prompt: String) {
        self.entries.put(key, prompt);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Render the context block attached to an outbound AI request.
pub fn render_context_prompt(context: &DocumentContext) -> String {
    format!(
        "<document_context>\n\
         title: {}\n\
         total_words: {}\n\
         last_edit: {}\n\
         selected_text: {}\n\
         current_paragraph: {}\n\
         content: {}\n\
         </document_context>",
        context.document_title,
        context.total_words,
        context.last_edit.to_rfc3339(),
        context.selected_text,
        context.current_paragraph,
        context.full_content,
    )
}
