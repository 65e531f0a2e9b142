//! quill: an AI-assisted rich-text document engine.
//!
//! The engine owns a structured text document (blocks of marked text runs)
//! and applies AI-issued commands to it: free-text model output is parsed
//! into structured edit/write operations, located inside the live tree,
//! and applied without corrupting structure or losing the user's
//! selection - including incremental "typing effect" insertion and
//! defenses against stale references, oversized writes and malformed
//! command syntax.
//!
//! Everything runs single-threaded and cooperative: hosts call into the
//! [`engine::Engine`] with user/AI turns and drive it with `tick`.

pub mod bus;
pub mod chat;
pub mod commands;
pub mod config;
pub mod context;
pub mod document;
pub mod engine;
pub mod error;
pub mod locator;
pub mod mutation;
pub mod persistence;
pub mod selection_guard;
pub mod streaming;

pub use bus::{CommandBus, EditorSignal, SignalSender};
pub use chat::{ChatMessage, Role, Transcript};
pub use commands::{parse_response, Command, ParseResult};
pub use config::EngineConfig;
pub use context::{ContextCache, ContextKey, ContextStore, DocumentContext, FormatState};
pub use document::{
    Block, BlockKind, DocRange, Document, MarkSet, Path, Point, Selection, TextRun,
};
pub use engine::{Engine, UserTurn};
pub use error::CoreError;
pub use locator::locate;
pub use mutation::{EditOutcome, MutationApplier, WriteOutcome};
pub use selection_guard::{BlurDecision, FocusTarget, RestoreOutcome, SelectionGuardian};
pub use streaming::{StartOutcome, StreamState, StreamingInserter, TickOutcome};
