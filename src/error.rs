//! Error taxonomy for the editing core.
//!
//! Nothing in this crate's core components throws past its boundary: every
//! failure is recovered where it happens and either shown to the user as a
//! chat message or logged and swallowed. `CoreError` classifies those
//! failures so the engine can route them consistently.

/// A recoverable failure inside the editing core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Raw AI text matched no known command pattern.
    Parse(String),

    /// An edit command's target text was not found in the document.
    Locate(String),

    /// A stored selection or path no longer resolves against the live
    /// document. Recovered silently; diagnostics only.
    StaleReference,

    /// A write would push the serialized document past the size guard.
    SizeLimit { len: usize, limit: usize },

    /// The upstream AI call failed or timed out. No mutation has happened
    /// by the time this arrives, so there is nothing to roll back.
    Upstream(String),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::Parse(raw) => write!(f, "no command recognized in: {raw}"),
            CoreError::Locate(old_text) => {
                write!(f, "Text not found: \"{old_text}\"")
            }
            CoreError::StaleReference => write!(f, "stale selection or path"),
            CoreError::SizeLimit { len, limit } => write!(
                f,
                "Document size limit reached ({len} of {limit} characters); content was not inserted"
            ),
            CoreError::Upstream(msg) => write!(f, "Error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

impl CoreError {
    /// Whether this failure is surfaced to the user in chat. Stale
    /// references are recovered silently and only logged.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, CoreError::StaleReference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_failure_message() {
        let err = CoreError::Locate("missing".into());
        assert_eq!(err.to_string(), "Text not found: \"missing\"");
        assert!(err.is_user_visible());
    }

    #[test]
    fn test_stale_reference_is_silent() {
        assert!(!CoreError::StaleReference.is_user_visible());
    }

    #[test]
    fn test_upstream_renders_as_error_line() {
        let err = CoreError::Upstream("request timed out".into());
        assert_eq!(err.to_string(), "Error: request timed out");
    }
}
