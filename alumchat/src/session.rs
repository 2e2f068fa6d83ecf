//! Chat session orchestration.
//!
//! [`ChatSession`] is the only component that touches both persistence
//! (conversation store, roster) and the transport channel for a single
//! user action, so each action keeps one consistent ordering: local
//! persistence happens before the network send, and the view never shows a
//! message that was not also durably recorded.
//!
//! It also owns all ephemeral view state (active contact, draft text,
//! staged image, popover visibility), which is reset on every contact
//! selection — including reselecting the same contact. Drafts are not
//! saved across contact switches.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;

use alumchat_proto::event::{MessageKind, UserProfile, WireEvent, WireMessage};

use crate::presence::{PresenceTracker, TypingRelay};
use crate::roster::{Contact, Roster};
use crate::store::backend::Storage;
use crate::store::calendar::{self, DayGroup};
use crate::store::{ConversationStore, Message, SELF_SENDER};
use crate::transport::Channel;

/// Roster preview for an image message without a caption.
pub const IMAGE_PREVIEW_PLACEHOLDER: &str = "📷 Photo";

/// Prefix prepended to the caption of an image message in roster previews.
pub const IMAGE_PREVIEW_PREFIX: &str = "📷 ";

/// Conversation-selection lifecycle.
///
/// `Selecting` is conceptually instantaneous (the log load is synchronous)
/// but modeled as a distinct state because entering it is what resets the
/// ephemeral view state. The session returns to `NoSelection` only when
/// the active contact is deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// No conversation open.
    NoSelection,
    /// A contact was chosen; its log load is in progress.
    Selecting {
        /// The contact being opened.
        email: String,
    },
    /// Log loaded, input enabled.
    Active {
        /// The open conversation's contact.
        contact: Contact,
    },
}

/// Events emitted for the embedding view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The active conversation received a new message; scroll to it.
    ScrollToLatest {
        /// The conversation that grew.
        email: String,
    },
    /// The active contact was deleted; show the empty pane.
    SelectionCleared,
}

/// Orchestrates transport, presence, store, and roster behind the
/// user-facing chat operations.
pub struct ChatSession<C, S> {
    channel: Arc<C>,
    store: ConversationStore<S>,
    roster: Roster<S>,
    presence: Arc<PresenceTracker>,
    typing: TypingRelay,
    me: UserProfile,
    selection: Selection,
    messages: Vec<Message>,
    draft: String,
    staged_image: Option<String>,
    emoji_picker_open: bool,
    context_menu_open: bool,
    events: mpsc::Sender<SessionEvent>,
}

impl<C: Channel, S: Storage> ChatSession<C, S> {
    /// Creates a session over the given channel and storage backend.
    ///
    /// The roster is loaded from storage once, here. Returns the session
    /// and a receiver for [`SessionEvent`]s that the view layer consumes.
    pub fn new(
        channel: Arc<C>,
        storage: Arc<S>,
        presence: Arc<PresenceTracker>,
        me: UserProfile,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (events, event_rx) = mpsc::channel(event_buffer);
        let session = Self {
            channel,
            store: ConversationStore::new(Arc::clone(&storage)),
            roster: Roster::load(storage),
            presence,
            typing: TypingRelay::new(),
            me,
            selection: Selection::NoSelection,
            messages: Vec::new(),
            draft: String::new(),
            staged_image: None,
            emoji_picker_open: false,
            context_menu_open: false,
            events,
        };
        (session, event_rx)
    }

    /// Overrides the typing debounce quiet period (primarily for tests).
    #[must_use]
    pub fn with_typing_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.typing = TypingRelay::with_quiet_period(quiet_period);
        self
    }

    /// Opens a conversation.
    ///
    /// Always performs the full reset — loading the log, clearing the
    /// unread counter, and dropping draft/staged image/popovers — even when
    /// reselecting the already-active contact.
    pub async fn select_contact(&mut self, contact: Contact) {
        // The previous conversation's typing burst ends here; the draft it
        // belonged to is discarded, not saved.
        self.end_typing_burst().await;

        self.selection = Selection::Selecting {
            email: contact.email.clone(),
        };
        self.reset_ephemeral();
        self.messages = self.store.load(&contact.email);
        self.roster.clear_unread(&contact.email);
        self.selection = Selection::Active { contact };
    }

    /// Updates the draft text and drives the typing debounce: at most one
    /// typing-start per burst of input, refreshed on every change.
    pub async fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        let Some(email) = self.active_email().map(str::to_string) else {
            return;
        };
        if let Some(signal) = self.typing.note_input() {
            self.channel
                .send(&WireEvent::typing_to(email, signal.is_typing()))
                .await;
        }
    }

    /// Periodic housekeeping: expires stale inbound typing indicators and
    /// emits the typing-stop once the local quiet period elapses.
    pub async fn tick(&mut self) {
        self.presence.sweep_expired();
        if let Some(signal) = self.typing.poll()
            && let Some(email) = self.active_email().map(str::to_string)
        {
            self.channel
                .send(&WireEvent::typing_to(email, signal.is_typing()))
                .await;
        }
    }

    /// Sends the current draft (and any staged image) to the active contact.
    ///
    /// No-ops when there is nothing to send or no conversation is open.
    /// The message is appended to the local log before the transport send,
    /// so it appears locally regardless of connection state.
    pub async fn send_message(&mut self) {
        let text = self.draft.trim().to_string();
        if text.is_empty() && self.staged_image.is_none() {
            return;
        }
        let Selection::Active { contact } = &self.selection else {
            return;
        };
        let contact = contact.clone();

        let timestamp = Local::now().to_rfc3339();
        let (kind, content) = match self.staged_image.take() {
            Some(image) => (MessageKind::Image, Some(image)),
            None => (MessageKind::Text, None),
        };

        let message = Message {
            sender: SELF_SENDER.to_string(),
            text: text.clone(),
            timestamp: timestamp.clone(),
            kind,
            content: content.clone(),
        };
        self.store.append(&contact.email, message.clone());
        self.messages.push(message);

        self.channel
            .send(&WireEvent::Message(WireMessage {
                sender: self.me.clone(),
                receiver: contact.email.clone(),
                text: text.clone(),
                timestamp: timestamp.clone(),
                kind,
                content,
            }))
            .await;

        self.roster.upsert_and_promote(Contact {
            last_message: message_preview(kind, &text),
            last_message_time: timestamp,
            ..contact
        });

        self.draft.clear();
        self.emoji_picker_open = false;
        self.end_typing_burst().await;
    }

    /// Processes one inbound transport event.
    ///
    /// Status and typing events go to the presence tracker; message events
    /// update the conversation store and roster. Malformed events (no
    /// sender email) are discarded, never fatal.
    pub fn handle_event(&mut self, event: &WireEvent) {
        match event {
            WireEvent::Message(message) => self.receive_message(message),
            WireEvent::Status { .. } | WireEvent::Typing { .. } => {
                self.presence.handle_event(event);
            }
        }
    }

    /// Deletes a contact: roster entry and conversation log. If the
    /// deleted contact was active, the session returns to no-selection.
    pub fn delete_contact(&mut self, email: &str) {
        self.roster.remove(email);
        self.store.remove(email);

        if self.active_email() == Some(email) {
            // Nobody left to notify about the burst; just forget it.
            self.typing.flush();
            self.selection = Selection::NoSelection;
            self.messages.clear();
            self.reset_ephemeral();
            let _ = self.events.try_send(SessionEvent::SelectionCleared);
        }
    }

    /// Stages an image attachment for the next [`send_message`](Self::send_message).
    pub fn stage_image(&mut self, content: impl Into<String>) {
        self.staged_image = Some(content.into());
    }

    /// Clears the staged image without sending it.
    pub fn discard_staged_image(&mut self) {
        self.staged_image = None;
    }

    /// Shows or hides the emoji picker.
    pub fn toggle_emoji_picker(&mut self) {
        self.emoji_picker_open = !self.emoji_picker_open;
    }

    /// Shows or hides the contextual menu.
    pub fn toggle_context_menu(&mut self) {
        self.context_menu_open = !self.context_menu_open;
    }

    /// Appends an emoji to the draft (the picker's insert action).
    pub async fn insert_emoji(&mut self, emoji: &str) {
        let updated = format!("{}{emoji}", self.draft);
        self.set_draft(updated).await;
    }

    /// Current selection state.
    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The active contact, if a conversation is open.
    #[must_use]
    pub fn active_contact(&self) -> Option<&Contact> {
        match &self.selection {
            Selection::Active { contact } => Some(contact),
            _ => None,
        }
    }

    /// The open conversation's messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The open conversation grouped into day buckets for display.
    #[must_use]
    pub fn grouped_messages(&self, today: NaiveDate) -> Vec<DayGroup> {
        calendar::group_by_calendar_day(&self.messages, today)
    }

    /// Current draft text.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// The staged image attachment, if any.
    #[must_use]
    pub fn staged_image(&self) -> Option<&str> {
        self.staged_image.as_deref()
    }

    /// Whether the emoji picker is open.
    #[must_use]
    pub const fn emoji_picker_open(&self) -> bool {
        self.emoji_picker_open
    }

    /// Whether the contextual menu is open.
    #[must_use]
    pub const fn context_menu_open(&self) -> bool {
        self.context_menu_open
    }

    /// The contact roster.
    #[must_use]
    pub fn roster(&self) -> &Roster<S> {
        &self.roster
    }

    /// The presence tracker.
    #[must_use]
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    fn active_email(&self) -> Option<&str> {
        match &self.selection {
            Selection::Active { contact } => Some(contact.email.as_str()),
            _ => None,
        }
    }

    fn reset_ephemeral(&mut self) {
        self.draft.clear();
        self.staged_image = None;
        self.emoji_picker_open = false;
        self.context_menu_open = false;
    }

    async fn end_typing_burst(&mut self) {
        let email = self.active_email().map(str::to_string);
        if self.typing.flush().is_some()
            && let Some(email) = email
        {
            self.channel.send(&WireEvent::typing_to(email, false)).await;
        }
    }

    fn receive_message(&mut self, incoming: &WireMessage) {
        let email = incoming.sender.email.trim().to_string();
        if email.is_empty() {
            tracing::warn!("message event without sender email, discarding");
            return;
        }

        let message = Message {
            sender: incoming.sender.display_name(),
            text: incoming.text.clone(),
            timestamp: incoming.timestamp.clone(),
            kind: incoming.kind,
            content: incoming.content.clone(),
        };
        self.store.append(&email, message.clone());

        let is_active = self.active_email() == Some(email.as_str());
        if is_active {
            self.messages.push(message);
        }

        let mut entry = self
            .roster
            .find(&email)
            .unwrap_or_else(|| Contact::from_profile(&incoming.sender));
        entry.last_message = message_preview(incoming.kind, &incoming.text);
        entry.last_message_time = incoming.timestamp.clone();
        self.roster.upsert_and_promote(entry);
        self.roster.increment_unread(&email, self.active_email());

        if is_active {
            let _ = self.events.try_send(SessionEvent::ScrollToLatest { email });
        }
    }
}

/// Roster preview string for a message: the text itself, or the image
/// indicator (plus caption, when present) for image messages.
#[must_use]
pub fn message_preview(kind: MessageKind, caption: &str) -> String {
    match kind {
        MessageKind::Text => caption.to_string(),
        MessageKind::Image if caption.is_empty() => IMAGE_PREVIEW_PLACEHOLDER.to_string(),
        MessageKind::Image => format!("{IMAGE_PREVIEW_PREFIX}{caption}"),
    }
}
