//! Engine configuration.
//!
//! All tunables for the editing core live here with serde-backed defaults,
//! so a partial config file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the editing core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between streaming insertions, in milliseconds.
    #[serde(default = "default_stream_interval_ms")]
    pub stream_interval_ms: u64,

    /// Whether write commands stream token-by-token. When off, writes are
    /// applied in one operation.
    #[serde(default = "default_true")]
    pub stream_writes: bool,

    /// Throttle window for selection-change processing, in milliseconds.
    #[serde(default = "default_selection_throttle_ms")]
    pub selection_throttle_ms: u64,

    /// Upper bound on the serialized document size, in characters. Writes
    /// against a document already past this bound are refused, so repeated
    /// model output cannot grow the document without limit.
    #[serde(default = "default_max_serialized_len")]
    pub max_serialized_len: usize,

    /// Collapse accidentally repeated content in write commands. A
    /// heuristic: it can mangle intentionally repetitive content, so it
    /// can be switched off.
    #[serde(default = "default_true")]
    pub collapse_repeated_writes: bool,

    /// Maximum number of chat messages retained in the transcript.
    #[serde(default = "default_max_transcript_messages")]
    pub max_transcript_messages: usize,
}

fn default_stream_interval_ms() -> u64 {
    20
}

fn default_selection_throttle_ms() -> u64 {
    100
}

fn default_max_serialized_len() -> usize {
    1000
}

fn default_max_transcript_messages() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream_interval_ms: default_stream_interval_ms(),
            stream_writes: true,
            selection_throttle_ms: default_selection_throttle_ms(),
            max_serialized_len: default_max_serialized_len(),
            collapse_repeated_writes: true,
            max_transcript_messages: default_max_transcript_messages(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file. Missing fields fall back to
    /// their defaults; a missing file is an error (callers decide whether
    /// to fall back to `EngineConfig::default()`).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Configuration error types.
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "IO error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "Parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.stream_interval_ms, 20);
        assert_eq!(config.selection_throttle_ms, 100);
        assert_eq!(config.max_serialized_len, 1000);
        assert!(config.collapse_repeated_writes);
        assert!(config.stream_writes);
        assert_eq!(config.max_transcript_messages, 50);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"stream_interval_ms": 5}"#).unwrap();
        assert_eq!(config.stream_interval_ms, 5);
        assert_eq!(config.max_serialized_len, 1000);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = EngineConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
