//! Chat transcript: the conversation surface the core reports through.
//!
//! The core never returns command results to its callers; confirmations,
//! failures, and upstream errors all land here as messages. The transcript
//! is capped so long sessions do not grow without bound.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: u64,
    pub text: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
}

/// Ordered message history with a retention cap.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    next_id: u64,
    #[serde(default = "default_cap")]
    cap: usize,
}

fn default_cap() -> usize {
    50
}

impl Transcript {
    pub fn new(cap: usize) -> Self {
        Self {
            messages: Vec::new(),
            next_id: 0,
            cap: cap.max(1),
        }
    }

    /// Rebuild a transcript from persisted messages, keeping id allocation
    /// ahead of everything restored.
    pub fn from_messages(messages: Vec<ChatMessage>, cap: usize) -> Self {
        let cap = cap.max(1);
        let next_id = messages.iter().map(|m| m.id + 1).max().unwrap_or(0);
        let mut transcript = Self {
            messages,
            next_id,
            cap,
        };
        if transcript.messages.len() > cap {
            let excess = transcript.messages.len() - cap;
            transcript.messages.drain(..excess);
        }
        transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>) -> &ChatMessage {
        let message = ChatMessage {
            id: self.next_id,
            text: text.into(),
            role,
            timestamp: Utc::now(),
        };
        self.next_id += 1;
        self.messages.push(message);
        if self.messages.len() > self.cap {
            let excess = self.messages.len() - self.cap;
            self.messages.drain(..excess);
        }
        self.messages.last().expect("just pushed")
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(Role::User, text)
    }

    pub fn push_ai(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(Role::Ai, text)
    }

    pub fn push_system(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(Role::System, text)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
