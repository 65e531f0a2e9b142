//! Typed command channel between the chat side and the editor side.
//!
//! Edit/write commands cross from chat logic (or the AI relay) into the
//! editing core through an explicit queue rather than any ambient event
//! bus. Senders are cheap to clone and fire-and-forget; the engine drains
//! the queue in arrival order on its own loop, so mutations never
//! interleave.

use std::sync::mpsc::{channel, Receiver, Sender};

/// A command signal delivered into the editing core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorSignal {
    Edit { old_text: String, new_text: String },
    Write { content: String },
}

/// Sending half of the command channel, handed to whoever produces
/// commands (the chat layer, the AI relay).
#[derive(Clone)]
pub struct SignalSender {
    tx: Sender<EditorSignal>,
}

impl SignalSender {
    /// Fire-and-forget delivery. Success or failure of the command itself
    /// is reported through the chat transcript, not back to the sender.
    pub fn send(&self, signal: EditorSignal) {
        if self.tx.send(signal).is_err() {
            tracing::warn!("editor signal dropped: receiver gone");
        }
    }

    pub fn edit(&self, old_text: impl Into<String>, new_text: impl Into<String>) {
        self.send(EditorSignal::Edit {
            old_text: old_text.into(),
            new_text: new_text.into(),
        });
    }

    pub fn write(&self, content: impl Into<String>) {
        self.send(EditorSignal::Write {
            content: content.into(),
        });
    }
}

/// The queue itself, owned by the component that composes both sides.
pub struct CommandBus {
    tx: Sender<EditorSignal>,
    rx: Receiver<EditorSignal>,
}

impl CommandBus {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> SignalSender {
        SignalSender {
            tx: self.tx.clone(),
        }
    }

    /// Take every queued signal, in arrival order, without blocking.
    pub fn drain(&self) -> Vec<EditorSignal> {
        self.rx.try_iter().collect()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_drain_in_arrival_order() {
        let bus = CommandBus::new();
        let sender = bus.sender();
        sender.edit("a", "b");
        sender.write("content");
        sender.edit("c", "d");

        let drained = bus.drain();
        assert_eq!(
            drained,
            vec![
                EditorSignal::Edit {
                    old_text: "a".into(),
                    new_text: "b".into(),
                },
                EditorSignal::Write {
                    content: "content".into(),
                },
                EditorSignal::Edit {
                    old_text: "c".into(),
                    new_text: "d".into(),
                },
            ]
        );
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn test_cloned_senders_share_the_queue() {
        let bus = CommandBus::new();
        let a = bus.sender();
        let b = a.clone();
        a.write("one");
        b.write("two");
        assert_eq!(bus.drain().len(), 2);
    }
}
