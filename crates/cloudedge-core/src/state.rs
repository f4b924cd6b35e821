//! UI-agnostic conversation state
//!
//! The store owns the chat transcript and the pending flag. UIs never mutate
//! it directly: they read snapshots and watch for changes, while the
//! [`DialogueController`](crate::controller::DialogueController) is the only
//! writer.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A chat message in the assistant conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Model,
            text: text.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// A prior turn projected into the `{role, parts: [{text}]}` shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

impl HistoryEntry {
    /// All text parts joined together
    pub fn text(&self) -> String {
        self.parts.iter().map(|p| p.text.as_str()).collect()
    }
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role,
            parts: vec![Part {
                text: message.text.clone(),
            }],
        }
    }
}

/// Read-only copy of the store handed to renderers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub messages: Vec<ChatMessage>,
    pub pending: bool,
}

/// Ordered message history plus the "request in flight" flag.
///
/// Backed by a watch channel so every mutation doubles as a change
/// notification for subscribers.
#[derive(Debug)]
pub struct ConversationStore {
    tx: watch::Sender<ConversationSnapshot>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ConversationSnapshot::default());
        Self { tx }
    }

    pub fn append(&self, message: ChatMessage) {
        self.tx.send_modify(|state| state.messages.push(message));
    }

    pub fn set_pending(&self, pending: bool) {
        self.tx.send_if_modified(|state| {
            if state.pending == pending {
                return false;
            }
            state.pending = pending;
            true
        });
    }

    pub fn snapshot(&self) -> ConversationSnapshot {
        self.tx.borrow().clone()
    }

    /// Receiver that wakes on every change to the conversation
    pub fn subscribe(&self) -> watch::Receiver<ConversationSnapshot> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().messages.is_empty()
    }

    pub fn is_pending(&self) -> bool {
        self.tx.borrow().pending
    }

    /// Start a turn: if nothing is in flight, project the prior messages into
    /// history, append `message` and mark the store pending. The check and the
    /// update happen under one lock. Returns `None` when a turn is already
    /// pending.
    pub(crate) fn begin_turn(&self, message: ChatMessage) -> Option<Vec<HistoryEntry>> {
        let mut history = None;
        self.tx.send_if_modified(|state| {
            if state.pending {
                return false;
            }
            history = Some(state.messages.iter().map(HistoryEntry::from).collect());
            state.messages.push(message);
            state.pending = true;
            true
        });
        history
    }

    /// Append the closing message of a turn and clear pending in one update
    pub(crate) fn finish_turn(&self, message: ChatMessage) {
        self.tx.send_modify(|state| {
            state.messages.push(message);
            state.pending = false;
        });
    }
}
