//! Durable, ordered message history per contact.
//!
//! Each contact's log is persisted independently under that contact's email
//! as the storage key, so a log can be loaded before (or without) its
//! contact appearing in the roster. Insertion order is authoritative:
//! timestamps are display metadata and are never used to re-sort, which
//! keeps clock skew from reordering a conversation.

pub mod backend;
pub mod calendar;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use alumchat_proto::event::MessageKind;

use backend::Storage;

/// Literal sender marker for the local user's own messages.
pub const SELF_SENDER: &str = "me";

/// One entry in a conversation log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Sender display name, or [`SELF_SENDER`] for own messages.
    pub sender: String,
    /// Message text; empty for image-only messages.
    #[serde(default)]
    pub text: String,
    /// ISO-8601 timestamp assigned by the sending client.
    pub timestamp: String,
    /// Text or image.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Encoded image payload for image messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl Message {
    /// Whether this message was sent by the local user.
    #[must_use]
    pub fn is_own(&self) -> bool {
        self.sender == SELF_SENDER
    }
}

/// Persistent per-contact message logs over a [`Storage`] backend.
///
/// All failure modes are absorbed here: missing or corrupt data loads as an
/// empty log, and write failures are logged and swallowed. Chat history is
/// best-effort; nothing above this layer sees a storage error.
pub struct ConversationStore<S> {
    storage: Arc<S>,
}

impl<S: Storage> ConversationStore<S> {
    /// Creates a store over the given backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Loads the ordered log for a contact; empty if none exists.
    pub fn load(&self, email: &str) -> Vec<Message> {
        let raw = match self.storage.read(email) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(contact = email, err = %e, "failed to read conversation log");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(contact = email, err = %e, "corrupt conversation log, starting empty");
                Vec::new()
            }
        }
    }

    /// Appends one message to a contact's log and persists it immediately.
    pub fn append(&self, email: &str, message: Message) {
        let mut log = self.load(email);
        log.push(message);
        self.persist(email, &log);
    }

    /// Deletes a contact's entire log (contact deletion cascade).
    pub fn remove(&self, email: &str) {
        if let Err(e) = self.storage.remove(email) {
            tracing::warn!(contact = email, err = %e, "failed to delete conversation log");
        }
    }

    fn persist(&self, email: &str, log: &[Message]) {
        match serde_json::to_string(log) {
            Ok(raw) => {
                if let Err(e) = self.storage.write(email, &raw) {
                    tracing::warn!(contact = email, err = %e, "failed to persist conversation log");
                }
            }
            Err(e) => {
                tracing::warn!(contact = email, err = %e, "failed to serialize conversation log");
            }
        }
    }
}
