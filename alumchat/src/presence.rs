//! Presence and typing state projected from transport events.
//!
//! [`PresenceTracker`] is the explicit context object that replaces any
//! process-wide registries: created empty at session start, fed every
//! inbound status/typing event by the session controller, and cleared on
//! logout/disconnect. It mutates its own state only in response to
//! transport events and never does I/O.
//!
//! [`TypingRelay`] is the outbound half: a small idle → typing →
//! idle-after-timeout state machine that turns a stream of keystrokes into
//! at most one typing-start per burst and one typing-stop after the quiet
//! period, instead of an event per keystroke.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use alumchat_proto::event::WireEvent;

/// Quiet period after which a typing indicator expires.
pub const TYPING_QUIET_PERIOD: Duration = Duration::from_secs(1);

/// Queryable presence state: who is online, who is typing.
pub struct PresenceTracker {
    online: Mutex<HashSet<String>>,
    typing: Mutex<HashMap<String, Instant>>,
    quiet_period: Duration,
}

impl PresenceTracker {
    /// Creates an empty tracker with the default quiet period.
    #[must_use]
    pub fn new() -> Self {
        Self::with_quiet_period(TYPING_QUIET_PERIOD)
    }

    /// Creates an empty tracker with a custom typing quiet period.
    #[must_use]
    pub fn with_quiet_period(quiet_period: Duration) -> Self {
        Self {
            online: Mutex::new(HashSet::new()),
            typing: Mutex::new(HashMap::new()),
            quiet_period,
        }
    }

    /// Projects one transport event into presence state.
    ///
    /// Frames without a `userId` (outbound-shaped frames echoed back, or
    /// malformed input) are ignored rather than rejected.
    pub fn handle_event(&self, event: &WireEvent) {
        match event {
            WireEvent::Status {
                user_id: Some(id),
                is_online,
            } => {
                let mut online = self.online.lock();
                if *is_online {
                    online.insert(id.clone());
                } else {
                    online.remove(id);
                }
            }
            WireEvent::Typing {
                user_id: Some(id),
                is_typing,
                ..
            } => {
                let mut typing = self.typing.lock();
                if *is_typing {
                    typing.insert(id.clone(), Instant::now());
                } else {
                    typing.remove(id);
                }
            }
            _ => {}
        }
    }

    /// Whether the given user currently has an open connection.
    #[must_use]
    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.lock().contains(user_id)
    }

    /// Snapshot of all online user ids.
    #[must_use]
    pub fn online_users(&self) -> HashSet<String> {
        self.online.lock().clone()
    }

    /// Whether the given user signalled typing within the quiet period.
    #[must_use]
    pub fn is_typing(&self, user_id: &str) -> bool {
        self.is_typing_at(user_id, Instant::now())
    }

    /// [`is_typing`](Self::is_typing) against an injected reference instant.
    #[must_use]
    pub fn is_typing_at(&self, user_id: &str, now: Instant) -> bool {
        self.typing
            .lock()
            .get(user_id)
            .is_some_and(|last| now.duration_since(*last) < self.quiet_period)
    }

    /// Drops typing entries older than the quiet period.
    pub fn sweep_expired(&self) {
        self.sweep_expired_at(Instant::now());
    }

    /// [`sweep_expired`](Self::sweep_expired) against an injected instant.
    pub fn sweep_expired_at(&self, now: Instant) {
        self.typing
            .lock()
            .retain(|_, last| now.duration_since(*last) < self.quiet_period);
    }

    /// Clears all presence state (logout/disconnect teardown).
    pub fn reset(&self) {
        self.online.lock().clear();
        self.typing.lock().clear();
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Signal produced by the [`TypingRelay`] for the session to forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    /// The local user started a typing burst.
    Started,
    /// The burst ended (quiet period elapsed, or forced by a flush).
    Stopped,
}

impl TypingSignal {
    /// The `isTyping` flag this signal maps to on the wire.
    #[must_use]
    pub const fn is_typing(self) -> bool {
        matches!(self, Self::Started)
    }
}

/// State of the local typing burst.
#[derive(Debug)]
struct RelayState {
    typing: bool,
    deadline: Option<Instant>,
}

/// Debounce state machine for outbound typing indicators.
///
/// `note_input` is called on every draft change and yields
/// [`TypingSignal::Started`] only on the idle → typing transition; every
/// call refreshes the deadline. `poll` yields [`TypingSignal::Stopped`]
/// once the deadline passes with no further input.
pub struct TypingRelay {
    quiet_period: Duration,
    state: Mutex<RelayState>,
}

impl TypingRelay {
    /// Creates an idle relay with the default quiet period.
    #[must_use]
    pub fn new() -> Self {
        Self::with_quiet_period(TYPING_QUIET_PERIOD)
    }

    /// Creates an idle relay with a custom quiet period.
    #[must_use]
    pub fn with_quiet_period(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            state: Mutex::new(RelayState {
                typing: false,
                deadline: None,
            }),
        }
    }

    /// Records a keystroke; returns `Started` once per burst.
    pub fn note_input(&self) -> Option<TypingSignal> {
        self.note_input_at(Instant::now())
    }

    /// [`note_input`](Self::note_input) against an injected instant.
    pub fn note_input_at(&self, now: Instant) -> Option<TypingSignal> {
        let mut state = self.state.lock();
        state.deadline = Some(now + self.quiet_period);
        if state.typing {
            None
        } else {
            state.typing = true;
            Some(TypingSignal::Started)
        }
    }

    /// Returns `Stopped` once the quiet period has elapsed since the last
    /// input of a live burst; `None` otherwise.
    pub fn poll(&self) -> Option<TypingSignal> {
        self.poll_at(Instant::now())
    }

    /// [`poll`](Self::poll) against an injected instant.
    pub fn poll_at(&self, now: Instant) -> Option<TypingSignal> {
        let mut state = self.state.lock();
        if state.typing && state.deadline.is_some_and(|deadline| now >= deadline) {
            state.typing = false;
            state.deadline = None;
            Some(TypingSignal::Stopped)
        } else {
            None
        }
    }

    /// Ends a live burst immediately (message sent, selection changed).
    pub fn flush(&self) -> Option<TypingSignal> {
        let mut state = self.state.lock();
        if state.typing {
            state.typing = false;
            state.deadline = None;
            Some(TypingSignal::Stopped)
        } else {
            None
        }
    }
}

impl Default for TypingRelay {
    fn default() -> Self {
        Self::new()
    }
}
