// Test-specific lint overrides: integration tests use unwrap/expect freely.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::missing_panics_doc,
    clippy::missing_docs_in_private_items
)]

//! End-to-end tests for the chat session controller:
//!
//! 1. Basic exchange: optimistic local append, roster preview, and the
//!    scroll signal for the active conversation.
//! 2. Image previews with and without captions.
//! 3. Deletion cascade across roster and conversation store.
//! 4. Optimistic append while the transport is down.
//! 5. Malformed inbound events never crash the subscriber.

use std::sync::Arc;

use tokio::sync::mpsc;

use alumchat::presence::PresenceTracker;
use alumchat::roster::Contact;
use alumchat::session::{ChatSession, IMAGE_PREVIEW_PLACEHOLDER, Selection, SessionEvent};
use alumchat::store::backend::MemoryStorage;
use alumchat::store::{ConversationStore, SELF_SENDER};
use alumchat::transport::memory::MemoryChannel;

use alumchat_proto::event::{MessageKind, UserProfile, WireEvent, WireMessage};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (
    ChatSession<MemoryChannel, MemoryStorage>,
    Arc<MemoryChannel>,
    Arc<MemoryStorage>,
    mpsc::Receiver<SessionEvent>,
) {
    let channel = Arc::new(MemoryChannel::new());
    let storage = Arc::new(MemoryStorage::new());
    let (session, events) = ChatSession::new(
        Arc::clone(&channel),
        Arc::clone(&storage),
        Arc::new(PresenceTracker::new()),
        UserProfile {
            email: "me@alum.example".into(),
            first_name: Some("Mel".into()),
            last_name: Some("Grad".into()),
            avatar: None,
        },
        16,
    );
    (session, channel, storage, events)
}

fn contact(email: &str, first_name: &str) -> Contact {
    Contact {
        email: email.into(),
        first_name: first_name.into(),
        last_name: String::new(),
        avatar_url: None,
        last_message: String::new(),
        last_message_time: String::new(),
        unread_count: 0,
    }
}

fn inbound_text(sender_email: &str, text: &str, timestamp: &str) -> WireEvent {
    WireEvent::Message(WireMessage {
        sender: UserProfile::from_email(sender_email),
        receiver: "me@alum.example".into(),
        text: text.into(),
        timestamp: timestamp.into(),
        kind: MessageKind::Text,
        content: None,
    })
}

// ---------------------------------------------------------------------------
// Basic exchange
// ---------------------------------------------------------------------------

#[tokio::test]
async fn basic_exchange_round_trip() {
    let (mut session, channel, storage, mut events) = setup();

    // Contact A is selected with an empty log.
    session.select_contact(contact("a@x.com", "A")).await;
    assert!(session.messages().is_empty());

    // User sends "hi".
    session.set_draft("hi").await;
    session.send_message().await;

    let log = ConversationStore::new(Arc::clone(&storage)).load("a@x.com");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].sender, SELF_SENDER);
    assert_eq!(log[0].text, "hi");
    assert_eq!(log[0].kind, MessageKind::Text);

    let contacts = session.roster().contacts();
    assert_eq!(contacts[0].email, "a@x.com");
    assert_eq!(contacts[0].last_message, "hi");

    // The message went out addressed to the contact.
    let sent_message = channel
        .sent()
        .into_iter()
        .find_map(|event| match event {
            WireEvent::Message(message) => Some(message),
            _ => None,
        })
        .expect("message event was sent");
    assert_eq!(sent_message.receiver, "a@x.com");
    assert_eq!(sent_message.sender.email, "me@alum.example");
    assert_eq!(sent_message.text, "hi");

    // Simulated reply appends to the same log; A is active, so unread
    // stays 0 and the view is told to scroll.
    session.handle_event(&inbound_text("a@x.com", "hello", "2024-05-01T12:01:00+00:00"));

    let log = ConversationStore::new(Arc::clone(&storage)).load("a@x.com");
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].text, "hello");
    assert_eq!(session.messages().len(), 2);
    assert_eq!(session.roster().find("a@x.com").unwrap().unread_count, 0);

    let scrolls: Vec<_> = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|event| matches!(event, SessionEvent::ScrollToLatest { .. }))
        .collect();
    assert_eq!(scrolls.len(), 1);
}

#[tokio::test]
async fn log_round_trips_through_reload() {
    let (mut session, _channel, storage, _events) = setup();
    session.select_contact(contact("a@x.com", "A")).await;

    let before = ConversationStore::new(Arc::clone(&storage)).load("a@x.com");

    for text in ["one", "two", "three"] {
        session.set_draft(text).await;
        session.send_message().await;
    }

    let after = ConversationStore::new(Arc::clone(&storage)).load("a@x.com");
    assert_eq!(after.len(), before.len() + 3);
    let texts: Vec<_> = after.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["one", "two", "three"]);

    // Reselecting reloads the same sequence from storage.
    session.select_contact(contact("a@x.com", "A")).await;
    assert_eq!(session.messages(), &after[..]);
}

// ---------------------------------------------------------------------------
// Image previews
// ---------------------------------------------------------------------------

#[tokio::test]
async fn image_without_caption_has_placeholder_preview() {
    let (mut session, _channel, _storage, _events) = setup();
    session.select_contact(contact("a@x.com", "A")).await;
    session.stage_image("data:image/jpeg;base64,QUJD");
    session.send_message().await;

    let preview = &session.roster().find("a@x.com").unwrap().last_message;
    assert_eq!(preview, IMAGE_PREVIEW_PLACEHOLDER);
    assert!(!preview.is_empty());
}

#[tokio::test]
async fn image_with_caption_has_indicator_plus_caption() {
    let (mut session, channel, _storage, _events) = setup();
    session.select_contact(contact("a@x.com", "A")).await;
    session.stage_image("data:image/jpeg;base64,QUJD");
    session.set_draft("party pic").await;
    session.send_message().await;

    let preview = session.roster().find("a@x.com").unwrap().last_message;
    assert!(preview.ends_with("party pic"));
    assert_ne!(preview, "party pic");

    // The wire message carries the image payload and caption.
    let sent_message = channel
        .sent()
        .into_iter()
        .find_map(|event| match event {
            WireEvent::Message(message) => Some(message),
            _ => None,
        })
        .expect("message event was sent");
    assert_eq!(sent_message.kind, MessageKind::Image);
    assert_eq!(
        sent_message.content.as_deref(),
        Some("data:image/jpeg;base64,QUJD")
    );
    assert_eq!(sent_message.text, "party pic");
}

// ---------------------------------------------------------------------------
// Deletion cascade
// ---------------------------------------------------------------------------

#[tokio::test]
async fn deleting_a_contact_removes_roster_entry_and_log() {
    let (mut session, _channel, storage, _events) = setup();
    session.select_contact(contact("a@x.com", "A")).await;
    session.set_draft("to be deleted").await;
    session.send_message().await;
    session.handle_event(&inbound_text("a@x.com", "also gone", "2024-05-01T12:00:00+00:00"));

    session.delete_contact("a@x.com");

    assert!(session.roster().find("a@x.com").is_none());
    assert!(
        ConversationStore::new(Arc::clone(&storage))
            .load("a@x.com")
            .is_empty()
    );
    assert_eq!(*session.selection(), Selection::NoSelection);
}

#[tokio::test]
async fn deleting_absent_contact_is_a_noop() {
    let (mut session, _channel, _storage, _events) = setup();
    session.delete_contact("nobody@x.com");
    assert!(session.roster().is_empty());
}

// ---------------------------------------------------------------------------
// Optimistic append while disconnected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sent_message_appears_locally_even_while_disconnected() {
    let (mut session, channel, storage, _events) = setup();
    session.select_contact(contact("a@x.com", "A")).await;
    channel.take_sent();
    channel.set_connected(false);

    session.set_draft("lost in transit").await;
    session.send_message().await;

    // Locally recorded and shown...
    assert_eq!(session.messages().len(), 1);
    let log = ConversationStore::new(Arc::clone(&storage)).load("a@x.com");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].text, "lost in transit");
    // ...but nothing reached the transport, and no error surfaced.
    assert!(channel.sent().is_empty());
}

// ---------------------------------------------------------------------------
// Malformed events
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_events_are_discarded_quietly() {
    let (mut session, _channel, _storage, _events) = setup();

    // A message with no sender email.
    session.handle_event(&inbound_text("", "ghost", "2024-05-01T12:00:00+00:00"));
    // Outbound-shaped frames echoed back without user ids.
    session.handle_event(&WireEvent::online());
    session.handle_event(&WireEvent::typing_to("me@alum.example", true));

    assert!(session.roster().is_empty());
    assert!(session.presence().online_users().is_empty());
}

#[tokio::test]
async fn session_state_survives_restart() {
    let channel = Arc::new(MemoryChannel::new());
    let storage = Arc::new(MemoryStorage::new());
    let me = UserProfile::from_email("me@alum.example");

    {
        let (mut session, _events) = ChatSession::new(
            Arc::clone(&channel),
            Arc::clone(&storage),
            Arc::new(PresenceTracker::new()),
            me.clone(),
            16,
        );
        session.select_contact(contact("a@x.com", "A")).await;
        session.set_draft("persist me").await;
        session.send_message().await;
        session.handle_event(&inbound_text("b@x.com", "waiting", "2024-05-01T12:00:00+00:00"));
    }

    // A fresh session over the same storage sees the same world.
    let (mut session, _events) = ChatSession::new(
        channel,
        Arc::clone(&storage),
        Arc::new(PresenceTracker::new()),
        me,
        16,
    );
    let contacts = session.roster().contacts();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0].email, "b@x.com");
    assert_eq!(contacts[0].unread_count, 1);

    session.select_contact(contact("a@x.com", "A")).await;
    assert_eq!(session.messages().len(), 1);
    assert_eq!(session.messages()[0].text, "persist me");
}
