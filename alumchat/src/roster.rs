//! Activity-ordered contact roster with unread bookkeeping.
//!
//! The roster is the ordered, deduplicated list of conversation partners
//! with denormalized preview fields. Order is most-recently-active first
//! and is recomputed on every relevant event: an upsert removes any
//! existing entries for the email first, then inserts at the front
//! (de-dup-then-promote, so stale duplicates can never survive a
//! promotion). The whole list lives behind one mutex so the
//! read-modify-write of a promotion never races with itself.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use alumchat_proto::event::UserProfile;

use crate::store::backend::Storage;

/// Storage key holding the ordered contact list.
pub const ROSTER_KEY: &str = "roster";

/// Avatar shown for contacts without one of their own.
pub const AVATAR_PLACEHOLDER: &str = "/assets/avatar-placeholder.png";

/// One conversation partner, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Stable identity; unique within the roster.
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Preview of the most recent message (may be an image placeholder).
    #[serde(default)]
    pub last_message: String,
    /// ISO-8601 timestamp of the most recent message.
    #[serde(default)]
    pub last_message_time: String,
    /// Messages received while this conversation was not selected.
    #[serde(default)]
    pub unread_count: u32,
}

impl Contact {
    /// Builds a roster entry from a wire profile (first message from a
    /// previously-unknown sender).
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            email: profile.email.clone(),
            first_name: profile.first_name.clone().unwrap_or_default(),
            last_name: profile.last_name.clone().unwrap_or_default(),
            avatar_url: profile.avatar.clone(),
            last_message: String::new(),
            last_message_time: String::new(),
            unread_count: 0,
        }
    }

    /// "First Last", either half alone, or the email when unnamed.
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }

    /// The contact's avatar URL, or the shared placeholder.
    #[must_use]
    pub fn avatar_or_placeholder(&self) -> &str {
        self.avatar_url.as_deref().unwrap_or(AVATAR_PLACEHOLDER)
    }
}

/// Persistent, activity-ordered contact list.
///
/// Loaded once at session start; written back after every mutation. Storage
/// failures are logged and swallowed (best-effort persistence).
pub struct Roster<S> {
    storage: Arc<S>,
    entries: Mutex<Vec<Contact>>,
}

impl<S: Storage> Roster<S> {
    /// Loads the roster from storage; missing or corrupt data starts empty.
    pub fn load(storage: Arc<S>) -> Self {
        let entries = match storage.read(ROSTER_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(err = %e, "corrupt roster, starting empty");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(err = %e, "failed to read roster, starting empty");
                Vec::new()
            }
        };
        Self {
            storage,
            entries: Mutex::new(entries),
        }
    }

    /// Updates (or inserts) the contact and moves it to the front.
    ///
    /// An existing entry keeps its unread count; identity and preview
    /// fields come from `contact`. Any stale duplicates for the same email
    /// are removed before the promotion.
    pub fn upsert_and_promote(&self, mut contact: Contact) {
        let mut entries = self.entries.lock();
        let mut existing_unread = None;
        entries.retain(|entry| {
            if entry.email == contact.email {
                existing_unread.get_or_insert(entry.unread_count);
                false
            } else {
                true
            }
        });
        if let Some(unread) = existing_unread {
            contact.unread_count = unread;
        }
        entries.insert(0, contact);
        self.persist(&entries);
    }

    /// Bumps the unread counter, unless the contact is the active
    /// conversation — the conversation the user is looking at must never
    /// accumulate unread messages, so it is pinned to zero instead.
    pub fn increment_unread(&self, email: &str, active: Option<&str>) {
        let mut entries = self.entries.lock();
        let Some(entry) = entries.iter_mut().find(|entry| entry.email == email) else {
            return;
        };
        if active == Some(email) {
            entry.unread_count = 0;
        } else {
            entry.unread_count += 1;
        }
        self.persist(&entries);
    }

    /// Resets the unread counter to zero (conversation became selected).
    pub fn clear_unread(&self, email: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|entry| entry.email == email) {
            entry.unread_count = 0;
            self.persist(&entries);
        }
    }

    /// Deletes the roster entry. Removing an absent email is a no-op.
    pub fn remove(&self, email: &str) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|entry| entry.email != email);
        if entries.len() != before {
            self.persist(&entries);
        }
    }

    /// Snapshot of the current roster, most recently active first.
    #[must_use]
    pub fn contacts(&self) -> Vec<Contact> {
        self.entries.lock().clone()
    }

    /// Looks up a contact by email.
    #[must_use]
    pub fn find(&self, email: &str) -> Option<Contact> {
        self.entries
            .lock()
            .iter()
            .find(|entry| entry.email == email)
            .cloned()
    }

    /// Number of roster entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the roster has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn persist(&self, entries: &[Contact]) {
        match serde_json::to_string(entries) {
            Ok(raw) => {
                if let Err(e) = self.storage.write(ROSTER_KEY, &raw) {
                    tracing::warn!(err = %e, "failed to persist roster");
                }
            }
            Err(e) => {
                tracing::warn!(err = %e, "failed to serialize roster");
            }
        }
    }
}
