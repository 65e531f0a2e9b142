//! Property-based tests: random documents and contents, core invariants.

mod common;

use proptest::prelude::*;
use quill::commands::collapse_repeated;
use quill::config::EngineConfig;
use quill::context::ContextStore;
use quill::document::Document;
use quill::locator::locate;
use quill::mutation::{EditOutcome, MutationApplier};
use quill::streaming::StreamingInserter;
use std::time::{Duration, Instant};

/// Paragraph text without newlines or quotes (which belong to command
/// syntax, not content).
fn paragraph_strategy() -> impl Strategy<Value = String> {
    "[a-z ]{0,30}"
}

proptest! {
    /// A no-op edit (old == new) never mutates the document, whatever the
    /// document or the needle.
    #[test]
    fn noop_edit_never_mutates(
        paragraphs in prop::collection::vec(paragraph_strategy(), 1..5),
        needle in "[a-z]{1,8}",
    ) {
        let mut doc = Document::from_paragraphs(&paragraphs);
        let mut ctx = ContextStore::new("Doc");
        let applier = MutationApplier::new(100_000);
        let before_revision = doc.revision();
        let before_text = doc.plain_text();

        let outcome = applier.apply_edit(&mut doc, &mut ctx, &needle, &needle);

        prop_assert_eq!(outcome, EditOutcome::NoOp);
        prop_assert_eq!(doc.revision(), before_revision);
        prop_assert_eq!(doc.plain_text(), before_text);
    }

    /// A successful edit changes only the leaf that matched; every other
    /// block's text is untouched.
    #[test]
    fn edit_touches_only_the_matched_leaf(
        before in "[a-m ]{0,12}",
        after in "[a-m ]{0,12}",
        replacement in "[n-z]{1,8}",
        others in prop::collection::vec("[a-m ]{0,20}", 0..4),
    ) {
        // Digits appear nowhere else, so the needle is unique.
        let needle = "42";
        let target = format!("{before}{needle}{after}");
        let mut paragraphs = others.clone();
        paragraphs.insert(0, target);

        let mut doc = Document::from_paragraphs(&paragraphs);
        let mut ctx = ContextStore::new("Doc");
        let applier = MutationApplier::new(100_000);

        let outcome = applier.apply_edit(&mut doc, &mut ctx, needle, &replacement);
        prop_assert_eq!(outcome, EditOutcome::Applied);
        prop_assert_eq!(
            doc.block_text(0).unwrap(),
            format!("{before}{replacement}{after}")
        );
        for (i, other) in others.iter().enumerate() {
            prop_assert_eq!(&doc.block_text(i + 1).unwrap(), other);
        }
    }

    /// Collapsing repeated runs never grows the text, and a doubled phrase
    /// always shrinks.
    #[test]
    fn collapse_only_shrinks(s in "[a-c ]{0,24}") {
        let collapsed = collapse_repeated(&s);
        prop_assert!(collapsed.chars().count() <= s.chars().count());

        if !s.is_empty() {
            let doubled = format!("{s}{s}");
            let collapsed_double = collapse_repeated(&doubled);
            prop_assert!(collapsed_double.chars().count() < doubled.chars().count());
        }
    }

    /// Locate always returns the first match in document order, and the
    /// returned range covers exactly the needle.
    #[test]
    fn locate_returns_first_match(
        blocks in prop::collection::vec("[a-m ]{0,15}", 1..5),
        hit_index in 0usize..5,
    ) {
        let needle = "42";
        let hit_index = hit_index % blocks.len();
        let mut paragraphs = blocks.clone();
        // Place the needle in every block at or after hit_index.
        for (i, p) in paragraphs.iter_mut().enumerate() {
            if i >= hit_index {
                p.push_str(needle);
            }
        }
        let doc = Document::from_paragraphs(&paragraphs);

        let range = locate(&doc, needle).unwrap();
        prop_assert_eq!(range.start.path.block, hit_index);
        prop_assert_eq!(doc.text_in_range(range).unwrap(), needle.to_string());
    }

    /// Streaming arbitrary multi-line content into an empty document
    /// reproduces it exactly, one block per line.
    #[test]
    fn streaming_reproduces_content_exactly(
        lines in prop::collection::vec("[a-z ]{0,12}", 1..4),
    ) {
        let content = lines.join("\n");
        let mut doc = Document::new();
        let mut ctx = ContextStore::new("Doc");
        let applier = MutationApplier::new(100_000);
        let mut inserter = StreamingInserter::new(Duration::from_millis(20));

        let mut now = Instant::now();
        inserter.start(&mut doc, &applier, &content, now);
        for _ in 0..100_000 {
            now += Duration::from_millis(20);
            inserter.tick(&mut doc, &applier, &mut ctx, now);
            if !inserter.is_active() {
                break;
            }
        }
        prop_assert!(!inserter.is_active());
        prop_assert_eq!(doc.plain_text(), content);
        prop_assert_eq!(doc.blocks().len(), lines.len());
    }

    /// The transcript never exceeds its cap and always keeps the newest
    /// messages.
    #[test]
    fn transcript_respects_cap(count in 1usize..120) {
        let mut transcript = quill::chat::Transcript::new(50);
        for i in 0..count {
            transcript.push_user(format!("message {i}"));
        }
        prop_assert!(transcript.messages().len() <= 50);
        prop_assert_eq!(
            &transcript.last().unwrap().text,
            &format!("message {}", count - 1)
        );
    }
}

/// Random mixed turns never panic and never leave the engine wedged: after
/// any sequence of AI responses, the document remains editable.
#[test]
fn engine_survives_random_turn_soup() {
    use common::harness::EngineHarness;

    let turns = [
        r#"/edit "a" to "b""#,
        "/edit nonsense",
        "/write mixed content here",
        "plain chatter",
        r#"/edit replace "missing" with "gone""#,
        "/write more\nlines\nhere",
    ];
    let config = EngineConfig {
        max_serialized_len: 10_000,
        ..EngineConfig::default()
    };
    let mut h = EngineHarness::with_config(config, &["a little seed text"]);
    for turn in turns.iter().cycle().take(24) {
        h.ai(turn);
        h.run_stream_to_completion();
    }
    // Still responsive to a well-formed edit.
    h.ai(r#"/edit "seed" to "base""#);
    assert!(h.document_text().contains("base"));
}
