//! Command parser: structured edit/write commands out of raw AI text.
//!
//! Model output is free text that may embed command syntax. `parse_response`
//! scans it for two forms: `/edit` followed by a replace instruction, and
//! `/write` followed by content to insert (multi-line, runs to the end of
//! the response). Anything that is not a recognized command stays plain
//! chat prose; malformed command syntax never produces an error, only a
//! help hint.

use regex::Regex;
use std::sync::OnceLock;

/// A structured instruction extracted from AI-generated text.
/// Immutable once parsed; lives for one AI turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Edit { old_text: String, new_text: String },
    Write { content: String },
}

impl Command {
    /// The user-facing confirmation shown in chat once the command has been
    /// applied. This replaces the raw command syntax; the two are never
    /// shown together.
    pub fn confirmation(&self) -> String {
        match self {
            Command::Edit { old_text, new_text } => {
                format!("✓ Edited text: replaced \"{old_text}\" with \"{new_text}\"")
            }
            Command::Write { content } => {
                format!("✓ Writing: \"{}\"", preview(content))
            }
        }
    }
}

/// First 40 characters of write content, with an ellipsis if truncated.
fn preview(content: &str) -> String {
    let mut out: String = content.chars().take(40).collect();
    if content.chars().count() > 40 {
        out.push_str("...");
    }
    out
}

/// Markers that introduce a command inside a response.
pub const EDIT_MARKER: &str = "/edit";
pub const WRITE_MARKER: &str = "/write";

/// Help text listing the valid edit forms, shown when command syntax is
/// present but does not parse.
pub fn edit_help() -> String {
    format!(
        "Invalid edit command. Try something like:\n\
         - {EDIT_MARKER} replace \"old text\" with \"new text\"\n\
         - {EDIT_MARKER} \"old text\" to \"new text\""
    )
}

/// Result of scanning one raw response.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParseResult {
    /// Commands in the order they appeared.
    pub commands: Vec<Command>,
    /// Non-command text (and help hints) to display verbatim in chat.
    pub prose: Vec<String>,
}

impl ParseResult {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.prose.is_empty()
    }
}

fn replace_with_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^replace\s+["']([^"']+)["']\s+with\s+["']([^"']+)["']"#)
            .expect("static regex compiles")
    })
}

fn quoted_to_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["']([^"']+)["']\s+to\s+["']([^"']+)["']"#).expect("static regex compiles")
    })
}

fn bare_pair_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"["']([^"']+)["']\s+["']([^"']+)["']"#).expect("static regex compiles")
    })
}

/// Parse the free-text arguments of an edit command into (old, new).
///
/// Patterns are tried in priority order; the first that matches wins:
/// 1. `replace "X" with "Y"`
/// 2. `"X" to "Y"`
/// 3. `"X" "Y"`
///
/// Quotes may be single or double. Empty captures cannot match, so
/// `replace "" with "x"` is malformed rather than an edit of nothing.
pub fn parse_edit_args(args: &str) -> Option<(String, String)> {
    let args = args.trim();
    for re in [replace_with_re(), quoted_to_re(), bare_pair_re()] {
        if let Some(caps) = re.captures(args) {
            return Some((caps[1].to_string(), caps[2].to_string()));
        }
    }
    None
}

/// Scan a raw AI response for commands.
///
/// `/edit` is recognized at the start of a line and consumes that line.
/// `/write` is recognized at the start of a line and consumes everything
/// from its arguments to the end of the response - generated content is
/// frequently multi-line and must be captured in full, so the scan stops
/// at the write marker. Lines recognized as neither are kept as prose.
///
/// When `collapse_repeats` is set, write content has maximal immediately
/// repeating runs collapsed (`(S)(S)+` becomes `S`). This papers over a
/// common model degeneracy where content arrives accidentally doubled; it
/// is a heuristic and can mangle intentionally repetitive content, which
/// is why it is flaggable.
pub fn parse_response(raw: &str, collapse_repeats: bool) -> ParseResult {
    let mut result = ParseResult::default();
    let mut lines = raw.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim_start();
        if let Some(args) = marker_args(trimmed, EDIT_MARKER) {
            match parse_edit_args(args) {
                Some((old_text, new_text)) => {
                    result.commands.push(Command::Edit { old_text, new_text });
                }
                None => {
                    // No command recognized: show the line as-is plus help.
                    result.prose.push(line.to_string());
                    result.prose.push(edit_help());
                }
            }
        } else if let Some(first) = marker_args(trimmed, WRITE_MARKER) {
            let mut content = first.trim_start().to_string();
            for rest in lines.by_ref() {
                if !content.is_empty() {
                    content.push('\n');
                }
                content.push_str(rest);
            }
            let content = if collapse_repeats {
                collapse_repeated(&content)
            } else {
                content
            };
            if !content.trim().is_empty() {
                result.commands.push(Command::Write { content });
            } else {
                result
                    .prose
                    .push("Invalid write command. Please provide the content to write.".to_string());
            }
            break;
        } else if !line.trim().is_empty() {
            result.prose.push(line.to_string());
        }
    }

    result
}

/// If `line` begins with `marker` as a whole token, return the argument
/// text after it. Avoids treating words like "/editorial" as commands.
fn marker_args<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Collapse maximal immediately-repeating runs: the scan equivalent of the
/// regex rewrite `(.+?)\1+ -> \1`. At each position the shortest period
/// with at least one immediate repetition wins, and the whole repeated run
/// collapses to a single period.
pub fn collapse_repeated(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < chars.len() {
        let remaining = chars.len() - i;
        let mut collapsed = false;
        for period in 1..=remaining / 2 {
            let mut reps = 1;
            while i + (reps + 1) * period <= chars.len()
                && chars[i..i + period] == chars[i + reps * period..i + (reps + 1) * period]
            {
                reps += 1;
            }
            if reps > 1 {
                out.extend(&chars[i..i + period]);
                i += reps * period;
                collapsed = true;
                break;
            }
        }
        if !collapsed {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}
