//! Engine: the composition root wiring the editing core together.
//!
//! One engine owns the document, the mutation pipeline, the streaming
//! inserter, the selection guardian, the context store, the command bus
//! and the chat transcript. Everything runs on the caller's single thread;
//! the engine is driven by explicit calls (`handle_user_message`,
//! `handle_ai_response`, focus/selection notifications) plus a `tick` the
//! host loop calls with the current time.
//!
//! Mutations are serialized by construction: commands drain from the bus
//! one at a time, streaming does one token per tick, and nothing here ever
//! re-enters. Failures inside the core surface as chat messages, never as
//! panics - the document stays editable whatever happens.

use crate::bus::{CommandBus, EditorSignal, SignalSender};
use crate::chat::{ChatMessage, Transcript};
use crate::commands::{self, Command, ParseResult};
use crate::config::EngineConfig;
use crate::context::{render_context_prompt, ContextCache, ContextKey, ContextStore,
    DocumentContext};
use crate::document::Document;
use crate::error::CoreError;
use crate::mutation::{EditOutcome, MutationApplier, WriteOutcome};
use crate::selection_guard::{BlurDecision, FocusTarget, RestoreOutcome, SelectionGuardian};
use crate::streaming::{StartOutcome, StreamingInserter};
use std::time::{Duration, Instant};

/// How many cached context prompts to keep around.
const PROMPT_CACHE_CAPACITY: usize = 8;

/// What the caller should do with a user message after the engine has
/// looked at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserTurn {
    /// The message was a local command and has been answered in the
    /// transcript; no AI call is needed.
    HandledLocally,
    /// Plain conversation (or an unknown command): forward to the AI relay
    /// with the current document context attached.
    ForwardToAi,
}

pub struct Engine {
    config: EngineConfig,
    document: Document,
    applier: MutationApplier,
    inserter: StreamingInserter,
    guardian: SelectionGuardian,
    context: ContextStore,
    prompt_cache: ContextCache,
    bus: CommandBus,
    transcript: Transcript,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_document(config, Document::new(), "Untitled Document")
    }

    pub fn with_document(
        config: EngineConfig,
        document: Document,
        title: impl Into<String>,
    ) -> Self {
        let applier = MutationApplier::new(config.max_serialized_len);
        let inserter = StreamingInserter::new(Duration::from_millis(config.stream_interval_ms));
        let guardian =
            SelectionGuardian::new(Duration::from_millis(config.selection_throttle_ms));
        let mut context = ContextStore::new(title);
        context.republish(&document, applier.format());
        let transcript = Transcript::new(config.max_transcript_messages);
        Self {
            config,
            document,
            applier,
            inserter,
            guardian,
            context,
            prompt_cache: ContextCache::new(PROMPT_CACHE_CAPACITY),
            bus: CommandBus::new(),
            transcript,
        }
    }

    /// Restore a persisted transcript into this engine.
    pub fn restore_transcript(&mut self, messages: Vec<ChatMessage>) {
        self.transcript =
            Transcript::from_messages(messages, self.config.max_transcript_messages);
    }

    // ===== Read access =====

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for the editing surface (user typing). The engine
    /// does not mediate user edits; it only defends against them (path
    /// revalidation, stale-selection handling).
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_streaming(&self) -> bool {
        self.inserter.is_active()
    }

    /// The current document context, always as of the last commit.
    pub fn outbound_context(&self) -> &DocumentContext {
        self.context.context()
    }

    /// The rendered context block attached to outbound AI requests,
    /// cached per (title, word count).
    pub fn outbound_prompt(&mut self) -> String {
        let key = ContextKey::of(self.context.context());
        if let Some(prompt) = self.prompt_cache.get(&key) {
            return prompt.clone();
        }
        let prompt = render_context_prompt(self.context.context());
        self.prompt_cache.set(key, prompt.clone());
        prompt
    }

    /// A sender for the relay layer to deliver parsed commands directly.
    pub fn command_sender(&self) -> SignalSender {
        self.bus.sender()
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.context.set_title(title);
        self.context.republish(&self.document, self.applier.format());
    }

    // ===== Inbound turns =====

    /// Handle a message the user typed into the chat input.
    pub fn handle_user_message(&mut self, text: &str, now: Instant) -> UserTurn {
        let text = text.trim();
        if text.is_empty() {
            return UserTurn::HandledLocally;
        }
        self.transcript.push_user(text);

        if !text.starts_with('/') {
            return UserTurn::ForwardToAi;
        }
        let (command, args) = match text.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (text, ""),
        };
        match command {
            "/help" => {
                let reply = self.help_text();
                self.transcript.push_ai(reply);
                UserTurn::HandledLocally
            }
            "/format" => {
                let format = serde_json::to_string_pretty(self.applier.format())
                    .unwrap_or_else(|_| "{}".to_string());
                self.transcript
                    .push_ai(format!("Current formatting:\n{format}"));
                UserTurn::HandledLocally
            }
            "/analyze" => {
                let reply = self.analysis_text();
                self.transcript.push_ai(reply);
                UserTurn::HandledLocally
            }
            commands::EDIT_MARKER => {
                match commands::parse_edit_args(args) {
                    Some((old_text, new_text)) => {
                        self.bus.sender().edit(old_text, new_text);
                        self.process_signals(now);
                    }
                    None => {
                        self.transcript.push_ai(commands::edit_help());
                    }
                }
                UserTurn::HandledLocally
            }
            commands::WRITE_MARKER => {
                if args.is_empty() {
                    self.transcript
                        .push_ai("Invalid write command. Please provide the content to write.");
                } else {
                    self.bus.sender().write(args);
                    self.process_signals(now);
                }
                UserTurn::HandledLocally
            }
            _ => UserTurn::ForwardToAi,
        }
    }

    /// Handle a raw AI response: parse out commands, show the rest (or the
    /// per-command confirmations) in chat, and apply what was recognized.
    pub fn handle_ai_response(&mut self, raw: &str, now: Instant) {
        let ParseResult { commands, prose } =
            commands::parse_response(raw, self.config.collapse_repeated_writes);
        if commands.is_empty() && prose.is_empty() {
            // Nothing recognizable at all (e.g. whitespace); show verbatim.
            if !raw.trim().is_empty() {
                self.transcript.push_ai(raw);
            }
            return;
        }
        if !prose.is_empty() {
            self.transcript.push_ai(prose.join("\n"));
        }
        let sender = self.bus.sender();
        for command in commands {
            match command {
                Command::Edit { old_text, new_text } => sender.edit(old_text, new_text),
                Command::Write { content } => sender.write(content),
            }
        }
        self.process_signals(now);
    }

    /// An upstream AI failure (error or timeout). Rendered as a system
    /// message; no document state to roll back since nothing was mutated.
    pub fn handle_ai_error(&mut self, message: &str) {
        self.transcript
            .push_system(CoreError::Upstream(message.to_string()).to_string());
    }

    // ===== Notifications from the editing surface =====

    pub fn notify_selection_changed(&mut self, now: Instant) {
        if self.guardian.on_selection_change(&self.document, now) {
            self.context.republish(&self.document, self.applier.format());
        }
    }

    pub fn notify_focus_gained(&mut self) -> RestoreOutcome {
        let outcome = self.guardian.on_focus_gained(&mut self.document);
        if outcome == RestoreOutcome::Restored {
            self.context.republish(&self.document, self.applier.format());
        }
        outcome
    }

    pub fn notify_blur(&mut self, target: FocusTarget) -> BlurDecision {
        self.guardian.on_blur(&self.document, target)
    }

    /// Replace the captured selection with AI-provided text (the
    /// selection-scoped edit flow). Prefers the guardian's stored
    /// selection, falling back to the live one. Returns false when no
    /// usable selection remains.
    pub fn apply_selection_edit(&mut self, replacement: &str) -> bool {
        let selection = self
            .guardian
            .stored()
            .copied()
            .or_else(|| self.document.active_selection().copied().filter(|s| !s.is_collapsed()));
        let Some(selection) = selection else {
            return false;
        };
        self.applier.apply_selection_edit(
            &mut self.document,
            &mut self.context,
            &selection,
            replacement,
        )
    }

    // ===== Driving =====

    /// Advance time-based work: queued commands, the active stream, and
    /// the guardian's trailing selection check. Returns true while a
    /// stream is still active so hosts know to keep ticking.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.process_signals(now);
        self.inserter
            .tick(&mut self.document, &self.applier, &mut self.context, now);
        if self.guardian.poll(&self.document, now) {
            self.context.republish(&self.document, self.applier.format());
        }
        self.inserter.is_active()
    }

    /// Drain and apply queued command signals in arrival order. While a
    /// stream is active, incoming commands are refused with a notice
    /// rather than queued - mutations must not interleave with the
    /// stream's token insertions.
    fn process_signals(&mut self, now: Instant) {
        for signal in self.bus.drain() {
            if self.inserter.is_active() {
                tracing::debug!(?signal, "command refused while streaming");
                self.transcript.push_system(
                    "Still writing content into the document; try again when it finishes.",
                );
                continue;
            }
            match signal {
                EditorSignal::Edit { old_text, new_text } => {
                    let confirmation = Command::Edit {
                        old_text: old_text.clone(),
                        new_text: new_text.clone(),
                    }
                    .confirmation();
                    match self.applier.apply_edit(
                        &mut self.document,
                        &mut self.context,
                        &old_text,
                        &new_text,
                    ) {
                        EditOutcome::Applied | EditOutcome::NoOp => {
                            self.transcript.push_ai(confirmation);
                        }
                        EditOutcome::NotFound => {
                            self.transcript
                                .push_system(CoreError::Locate(old_text).to_string());
                        }
                    }
                }
                EditorSignal::Write { content } => {
                    let confirmation = Command::Write {
                        content: content.clone(),
                    }
                    .confirmation();
                    if self.config.stream_writes {
                        match self.inserter.start(
                            &mut self.document,
                            &self.applier,
                            &content,
                            now,
                        ) {
                            StartOutcome::Started => {
                                self.transcript.push_ai(confirmation);
                            }
                            StartOutcome::Busy => {
                                self.transcript.push_system(
                                    "Still writing content into the document; try again when it finishes.",
                                );
                            }
                            StartOutcome::SizeLimitExceeded { len, limit } => {
                                self.transcript
                                    .push_system(CoreError::SizeLimit { len, limit }.to_string());
                            }
                        }
                    } else {
                        match self.applier.apply_write(
                            &mut self.document,
                            &mut self.context,
                            &content,
                        ) {
                            WriteOutcome::Applied => {
                                self.transcript.push_ai(confirmation);
                            }
                            WriteOutcome::SizeLimitExceeded { len, limit } => {
                                self.transcript
                                    .push_system(CoreError::SizeLimit { len, limit }.to_string());
                            }
                        }
                    }
                }
            }
        }
    }

    fn help_text(&self) -> String {
        format!(
            "Available commands:\n\
             - /format: Show current formatting\n\
             - {edit}: Edit selected text (e.g., {edit} replace \"old text\" with \"new text\")\n\
             - {write}: Write content at current cursor position (e.g., {write} This is new text)\n\
             - /analyze: Analyze document structure and content\n\
             - /help: Show this help message",
            edit = commands::EDIT_MARKER,
            write = commands::WRITE_MARKER,
        )
    }

    fn analysis_text(&self) -> String {
        let context = self.context.context();
        let format = &context.current_format;
        format!(
            "Analysis of document:\n\
             - Total words: {}\n\
             - Current format: {}, {}\n\
             - Last edited: {}\n\
             - Document title: {}",
            context.total_words,
            format.font.as_deref().unwrap_or("default"),
            if format.bold { "bold" } else { "normal" },
            context.last_edit.to_rfc3339(),
            context.document_title,
        )
    }
}
