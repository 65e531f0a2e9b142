//! Test harness wrapping the engine with a controllable clock.
//!
//! Integration tests drive the engine exactly like a host loop would -
//! user turns, AI turns, ticks - but with synthetic time so streaming and
//! throttling are deterministic and fast.

use quill::chat::ChatMessage;
use quill::config::EngineConfig;
use quill::document::Document;
use quill::engine::{Engine, UserTurn};
use std::time::{Duration, Instant};

pub struct EngineHarness {
    pub engine: Engine,
    now: Instant,
}

impl EngineHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default(), &[])
    }

    pub fn with_document(paragraphs: &[&str]) -> Self {
        Self::with_config(EngineConfig::default(), paragraphs)
    }

    pub fn with_config(config: EngineConfig, paragraphs: &[&str]) -> Self {
        let document = if paragraphs.is_empty() {
            Document::new()
        } else {
            Document::from_paragraphs(paragraphs)
        };
        Self {
            engine: Engine::with_document(config, document, "Untitled Document"),
            now: Instant::now(),
        }
    }

    pub fn now(&self) -> Instant {
        self.now
    }

    /// Deliver a raw AI response.
    pub fn ai(&mut self, raw: &str) {
        self.engine.handle_ai_response(raw, self.now);
    }

    /// Deliver a user chat message.
    pub fn user(&mut self, text: &str) -> UserTurn {
        self.engine.handle_user_message(text, self.now)
    }

    /// Advance the clock and tick once.
    pub fn advance(&mut self, ms: u64) {
        self.now += Duration::from_millis(ms);
        self.engine.tick(self.now);
    }

    /// Tick at the stream interval until the engine goes idle.
    pub fn run_stream_to_completion(&mut self) {
        let step = self.engine.config().stream_interval_ms.max(1);
        for _ in 0..100_000 {
            self.now += Duration::from_millis(step);
            if !self.engine.tick(self.now) {
                return;
            }
        }
        panic!("stream never completed");
    }

    pub fn document_text(&self) -> String {
        self.engine.document().plain_text()
    }

    pub fn last_message(&self) -> &ChatMessage {
        self.engine
            .transcript()
            .last()
            .expect("transcript has messages")
    }
}
