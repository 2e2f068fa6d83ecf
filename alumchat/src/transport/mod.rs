//! Transport layer for the alumchat messaging endpoint.
//!
//! Defines the [`Channel`] trait that concrete transports implement:
//! - [`socket::SocketChannel`] — WebSocket connection to the live endpoint
//! - [`memory::MemoryChannel`] — in-process channel for tests
//!
//! Inbound events fan out through an [`EventBus`]: every registered
//! subscriber sees every event, and dropping (or cancelling) the returned
//! [`Subscription`] unregisters it. Tests inject synthetic events through
//! the same path, so nothing above this layer knows about sockets.

pub mod memory;
pub mod socket;

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use uuid::Uuid;

use alumchat_proto::event::WireEvent;

/// Callback invoked once per inbound event.
pub type EventCallback = Arc<dyn Fn(&WireEvent) + Send + Sync>;

/// Errors that can occur when setting up a channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The endpoint URL could not be parsed.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

/// Token identifying one registered subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

/// Fan-out registry for inbound events.
///
/// Callbacks run on the task that publishes the event (the transport's
/// reader task), so they must be quick; subscribers that need to do real
/// work should forward into a channel of their own.
pub struct EventBus {
    subscribers: Mutex<Vec<(SubscriberId, EventCallback)>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Registers a callback; every published event is delivered to it until
    /// the returned [`Subscription`] is cancelled or dropped.
    pub fn subscribe(self: &Arc<Self>, callback: EventCallback) -> Subscription {
        let id = SubscriberId::new();
        self.subscribers.lock().push((id.clone(), callback));
        Subscription {
            bus: Arc::downgrade(self),
            id,
            active: true,
        }
    }

    /// Delivers an event to every current subscriber.
    pub fn publish(&self, event: &WireEvent) {
        // Snapshot under the lock, invoke outside it, so a callback that
        // subscribes or unsubscribes does not deadlock.
        let callbacks: Vec<EventCallback> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of currently registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    fn unsubscribe(&self, id: &SubscriberId) {
        self.subscribers.lock().retain(|(sid, _)| sid != id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one registered subscriber; unregisters on drop.
pub struct Subscription {
    bus: Weak<EventBus>,
    id: SubscriberId,
    active: bool,
}

impl Subscription {
    /// Unregisters the callback. Safe to call more than once.
    pub fn cancel(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Bidirectional event channel to the messaging endpoint.
///
/// `send` is fire-and-forget: an event sent while the channel is closed is
/// silently dropped. There is no queuing, acknowledgement, or resend — the
/// chat feature is best-effort by design, and callers tolerate loss.
pub trait Channel: Send + Sync {
    /// Transmits an event, or drops it silently if the channel is closed.
    fn send(&self, event: &WireEvent) -> impl std::future::Future<Output = ()> + Send;

    /// Registers a listener for inbound events. Multiple independent
    /// subscribers are supported; each receives every event.
    fn subscribe(&self, callback: EventCallback) -> Subscription;

    /// Whether the channel currently has an open connection.
    fn is_connected(&self) -> bool;
}
