//! Local persistence: document, transcript and metadata as JSON files.
//!
//! Storage is a plain key-value affair - one file per concern under a data
//! directory. The directory comes in through `StorageContext`; only the
//! top-level binary consults `dirs::*` to build one, so tests run against
//! temp directories and nothing here reaches for hidden global paths.

use crate::chat::ChatMessage;
use crate::document::Document;
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DOCUMENT_FILE: &str = "document.json";
const MESSAGES_FILE: &str = "messages.json";
const METADATA_FILE: &str = "metadata.json";

/// Where persisted state lives.
#[derive(Debug, Clone)]
pub struct StorageContext {
    pub data_dir: PathBuf,
}

impl StorageContext {
    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

/// Document metadata persisted next to the content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub last_edit: DateTime<Utc>,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        Self {
            title: "Untitled Document".to_string(),
            last_edit: Utc::now(),
        }
    }
}

/// Everything a session restores on startup.
#[derive(Debug, Default)]
pub struct SavedState {
    pub document: Document,
    pub messages: Vec<ChatMessage>,
    pub metadata: DocumentMetadata,
}

/// Write the full state to disk, creating the data directory if needed.
pub fn save_state(
    storage: &StorageContext,
    document: &Document,
    messages: &[ChatMessage],
    metadata: &DocumentMetadata,
) -> Result<()> {
    fs::create_dir_all(&storage.data_dir)
        .with_context(|| format!("creating {}", storage.data_dir.display()))?;
    write_json(&storage.path(DOCUMENT_FILE), document)?;
    write_json(&storage.path(MESSAGES_FILE), &messages)?;
    write_json(&storage.path(METADATA_FILE), metadata)?;
    tracing::debug!(dir = %storage.data_dir.display(), "state saved");
    Ok(())
}

/// Load persisted state. Missing files fall back to defaults per concern,
/// so a fresh data directory yields an empty session rather than an error.
pub fn load_state(storage: &StorageContext) -> Result<SavedState> {
    Ok(SavedState {
        document: read_json(&storage.path(DOCUMENT_FILE))?.unwrap_or_default(),
        messages: read_json(&storage.path(MESSAGES_FILE))?.unwrap_or_default(),
        metadata: read_json(&storage.path(METADATA_FILE))?.unwrap_or_default(),
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("serializing {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let value = serde_json::from_str(&text)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
    }
}
