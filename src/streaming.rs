//! Streaming inserter: applying write content incrementally.
//!
//! Instead of dropping generated content into the document in one shot, a
//! streaming session inserts it token by token with a bounded delay
//! between insertions, producing a visible typing effect. Each tick does
//! O(1) work (one token) because ticks share the event loop with user
//! interaction.
//!
//! At most one session runs at a time; starting another while one is
//! active is refused. The insertion point is revalidated on every tick -
//! if user edits invalidated it, the session cancels rather than writing
//! into the wrong place. Concurrent user edits while a stream is active
//! remain a known race beyond that guard: the behavior is intentionally
//! conservative, not a full resolution.

use crate::context::ContextStore;
use crate::document::{Document, Point};
use crate::mutation::{prepare_insertion, MutationApplier};
use std::time::{Duration, Instant};

/// Lifecycle of the inserter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
    /// The last session ended early (insertion point lost).
    Cancelled,
}

/// Result of attempting to start a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A session is already active; at most one runs at a time.
    Busy,
    SizeLimitExceeded { len: usize, limit: usize },
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No session is active.
    Idle,
    /// The inter-tick delay has not elapsed yet.
    NotDue,
    /// One token was inserted.
    Inserted,
    /// A block boundary was inserted between lines.
    BrokeLine,
    /// The token queue emptied; the session is over and context republished.
    Completed,
    /// The insertion point no longer resolves; the session was cancelled.
    Cancelled,
}

/// Ephemeral state for one in-progress write.
struct StreamingSession {
    /// Token runs per line: alternating word and whitespace runs, spacing
    /// preserved verbatim.
    lines: Vec<Vec<String>>,
    line: usize,
    token: usize,
    cursor: Point,
}

/// Token-paced application of write content.
pub struct StreamingInserter {
    state: StreamState,
    session: Option<StreamingSession>,
    interval: Duration,
    next_tick_at: Option<Instant>,
}

impl StreamingInserter {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: StreamState::Idle,
            session: None,
            interval,
            next_tick_at: None,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == StreamState::Streaming
    }

    /// Begin streaming `content`. Applies the same pre-insertion
    /// normalization as a one-shot write (delete active selection, seed an
    /// empty document, fall back to end-of-document), then queues tokens.
    pub fn start(
        &mut self,
        doc: &mut Document,
        applier: &MutationApplier,
        content: &str,
        now: Instant,
    ) -> StartOutcome {
        if self.is_active() {
            tracing::debug!("write refused: a stream is already active");
            return StartOutcome::Busy;
        }
        if let Err(crate::error::CoreError::SizeLimit { len, limit }) =
            applier.check_size_guard(doc)
        {
            tracing::warn!(len, limit, "stream refused by size guard");
            return StartOutcome::SizeLimitExceeded { len, limit };
        }

        let cursor = prepare_insertion(doc);
        let lines: Vec<Vec<String>> = content.split('\n').map(tokenize_line).collect();
        self.session = Some(StreamingSession {
            lines,
            line: 0,
            token: 0,
            cursor,
        });
        self.state = StreamState::Streaming;
        self.next_tick_at = Some(now + self.interval);
        tracing::info!(chars = content.len(), "stream started");
        StartOutcome::Started
    }

    /// Advance the session by at most one unit of work. The next tick is
    /// scheduled relative to this tick's completion, so pacing is
    /// cooperative rather than a hard real-time guarantee.
    pub fn tick(
        &mut self,
        doc: &mut Document,
        applier: &MutationApplier,
        ctx: &mut ContextStore,
        now: Instant,
    ) -> TickOutcome {
        if !self.is_active() {
            return TickOutcome::Idle;
        }
        if self.next_tick_at.is_some_and(|due| now < due) {
            return TickOutcome::NotDue;
        }
        let Some(session) = self.session.as_mut() else {
            self.state = StreamState::Idle;
            return TickOutcome::Idle;
        };

        if !doc.resolve_point(session.cursor) {
            tracing::warn!("stream cancelled: insertion point no longer resolves");
            self.session = None;
            self.state = StreamState::Cancelled;
            self.next_tick_at = None;
            ctx.republish(doc, applier.format());
            return TickOutcome::Cancelled;
        }

        if session.line >= session.lines.len() {
            return self.complete(doc, applier, ctx);
        }

        if session.token >= session.lines[session.line].len() {
            session.line += 1;
            session.token = 0;
            if session.line >= session.lines.len() {
                return self.complete(doc, applier, ctx);
            }
            // A new line of content starts a new block.
            match doc.split_block(session.cursor) {
                Some(cursor) => session.cursor = cursor,
                None => {
                    self.session = None;
                    self.state = StreamState::Cancelled;
                    self.next_tick_at = None;
                    ctx.republish(doc, applier.format());
                    return TickOutcome::Cancelled;
                }
            }
            self.next_tick_at = Some(now + self.interval);
            return TickOutcome::BrokeLine;
        }

        let token = session.lines[session.line][session.token].clone();
        match doc.insert_text(session.cursor, &token) {
            Some(cursor) => session.cursor = cursor,
            None => {
                self.session = None;
                self.state = StreamState::Cancelled;
                self.next_tick_at = None;
                ctx.republish(doc, applier.format());
                return TickOutcome::Cancelled;
            }
        }
        session.token += 1;
        self.next_tick_at = Some(now + self.interval);
        TickOutcome::Inserted
    }

    fn complete(
        &mut self,
        doc: &Document,
        applier: &MutationApplier,
        ctx: &mut ContextStore,
    ) -> TickOutcome {
        self.session = None;
        self.state = StreamState::Idle;
        self.next_tick_at = None;
        ctx.republish(doc, applier.format());
        tracing::info!("stream completed");
        TickOutcome::Completed
    }

    /// Abandon the current session, leaving whatever was already inserted.
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            self.state = StreamState::Cancelled;
            self.next_tick_at = None;
        }
    }
}

/// Split one line into alternating runs of non-whitespace and whitespace
/// characters. Both kinds are inserted verbatim so original spacing
/// survives the round trip.
fn tokenize_line(line: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current_is_space: Option<bool> = None;
    for ch in line.chars() {
        let is_space = ch.is_whitespace();
        if current_is_space == Some(is_space) {
            if let Some(last) = tokens.last_mut() {
                last.push(ch);
                continue;
            }
        }
        tokens.push(ch.to_string());
        current_is_space = Some(is_space);
    }
    tokens
}
