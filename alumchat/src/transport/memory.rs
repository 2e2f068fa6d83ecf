//! In-process channel for tests.
//!
//! Records every event sent through it and lets tests inject synthetic
//! inbound events through the same fan-out path a real socket would use.
//! Connectivity is a toggle so the fire-and-forget drop semantics can be
//! exercised without a network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use alumchat_proto::event::WireEvent;

use super::{Channel, EventBus, EventCallback, Subscription};

/// Channel implementation backed by an in-memory event list.
pub struct MemoryChannel {
    bus: Arc<EventBus>,
    sent: Mutex<Vec<WireEvent>>,
    connected: AtomicBool,
}

impl MemoryChannel {
    /// Creates a connected channel with no recorded events.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bus: Arc::new(EventBus::new()),
            sent: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// Delivers a synthetic inbound event to every subscriber.
    pub fn inject(&self, event: &WireEvent) {
        self.bus.publish(event);
    }

    /// Simulates the connection opening or dropping.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Snapshot of every event sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<WireEvent> {
        self.sent.lock().clone()
    }

    /// Drains and returns the recorded events.
    pub fn take_sent(&self) -> Vec<WireEvent> {
        self.sent.lock().drain(..).collect()
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for MemoryChannel {
    async fn send(&self, event: &WireEvent) {
        if !self.connected.load(Ordering::SeqCst) {
            tracing::debug!("channel closed, dropping outbound event");
            return;
        }
        self.sent.lock().push(event.clone());
    }

    fn subscribe(&self, callback: EventCallback) -> Subscription {
        self.bus.subscribe(callback)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
