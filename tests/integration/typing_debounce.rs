// Test-specific lint overrides: integration tests use unwrap/expect freely.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown,
    clippy::missing_panics_doc,
    clippy::missing_docs_in_private_items
)]

//! Typing indicator debounce, end to end: a burst of keystrokes produces
//! exactly one typing-start event, followed by exactly one typing-stop
//! after the quiet period — never one pair per keystroke.
//!
//! The session under test uses a short quiet period so the tests can wait
//! it out in real time; the deterministic timer math is covered by the
//! relay's unit tests.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use alumchat::presence::PresenceTracker;
use alumchat::roster::Contact;
use alumchat::session::{ChatSession, SessionEvent};
use alumchat::store::backend::MemoryStorage;
use alumchat::transport::memory::MemoryChannel;

use alumchat_proto::event::{UserProfile, WireEvent};

const QUIET: Duration = Duration::from_millis(50);

fn setup() -> (
    ChatSession<MemoryChannel, MemoryStorage>,
    Arc<MemoryChannel>,
    mpsc::Receiver<SessionEvent>,
) {
    let channel = Arc::new(MemoryChannel::new());
    let (session, events) = ChatSession::new(
        Arc::clone(&channel),
        Arc::new(MemoryStorage::new()),
        Arc::new(PresenceTracker::new()),
        UserProfile::from_email("me@alum.example"),
        16,
    );
    (session.with_typing_quiet_period(QUIET), channel, events)
}

fn contact(email: &str) -> Contact {
    Contact {
        email: email.into(),
        first_name: String::new(),
        last_name: String::new(),
        avatar_url: None,
        last_message: String::new(),
        last_message_time: String::new(),
        unread_count: 0,
    }
}

/// The typing events sent so far, as `(receiver, is_typing)` pairs.
fn typing_events(channel: &MemoryChannel) -> Vec<(String, bool)> {
    channel
        .sent()
        .into_iter()
        .filter_map(|event| match event {
            WireEvent::Typing {
                receiver_id: Some(receiver),
                is_typing,
                ..
            } => Some((receiver, is_typing)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn rapid_keystrokes_produce_one_start_and_one_stop() {
    let (mut session, channel, _events) = setup();
    session.select_contact(contact("a@x.com")).await;

    // Simulate rapid typing: many draft updates inside the quiet window.
    let mut draft = String::new();
    for c in "hello there".chars() {
        draft.push(c);
        session.set_draft(draft.clone()).await;
    }

    assert_eq!(typing_events(&channel), vec![("a@x.com".into(), true)]);

    // Let the quiet period lapse, then tick.
    tokio::time::sleep(QUIET + Duration::from_millis(20)).await;
    session.tick().await;

    assert_eq!(
        typing_events(&channel),
        vec![("a@x.com".into(), true), ("a@x.com".into(), false)]
    );

    // Further ticks stay quiet.
    session.tick().await;
    assert_eq!(typing_events(&channel).len(), 2);
}

#[tokio::test]
async fn no_stop_while_keystrokes_keep_coming() {
    let (mut session, channel, _events) = setup();
    session.select_contact(contact("a@x.com")).await;

    // Keep refreshing the deadline faster than the quiet period.
    for i in 0..4 {
        session.set_draft(format!("draft {i}")).await;
        tokio::time::sleep(QUIET / 2).await;
        session.tick().await;
    }

    assert_eq!(typing_events(&channel), vec![("a@x.com".into(), true)]);
}

#[tokio::test]
async fn a_new_burst_after_a_stop_starts_again() {
    let (mut session, channel, _events) = setup();
    session.select_contact(contact("a@x.com")).await;

    session.set_draft("first burst").await;
    tokio::time::sleep(QUIET + Duration::from_millis(20)).await;
    session.tick().await;

    session.set_draft("second burst").await;
    tokio::time::sleep(QUIET + Duration::from_millis(20)).await;
    session.tick().await;

    assert_eq!(
        typing_events(&channel),
        vec![
            ("a@x.com".into(), true),
            ("a@x.com".into(), false),
            ("a@x.com".into(), true),
            ("a@x.com".into(), false),
        ]
    );
}

#[tokio::test]
async fn sending_the_message_ends_the_burst() {
    let (mut session, channel, _events) = setup();
    session.select_contact(contact("a@x.com")).await;

    session.set_draft("on my way").await;
    session.send_message().await;

    assert_eq!(
        typing_events(&channel),
        vec![("a@x.com".into(), true), ("a@x.com".into(), false)]
    );
}

#[tokio::test]
async fn switching_contacts_stops_the_old_burst() {
    let (mut session, channel, _events) = setup();
    session.select_contact(contact("a@x.com")).await;
    session.set_draft("half a thought").await;

    session.select_contact(contact("b@x.com")).await;

    // The stop went to the previous contact; the new conversation has no
    // live burst (and the old draft is gone, not carried over).
    assert_eq!(
        typing_events(&channel),
        vec![("a@x.com".into(), true), ("a@x.com".into(), false)]
    );
    assert_eq!(session.draft(), "");
}

#[tokio::test]
async fn typing_without_a_selection_sends_nothing() {
    let (mut session, channel, _events) = setup();
    session.set_draft("shouting into the void").await;

    assert!(typing_events(&channel).is_empty());
}
