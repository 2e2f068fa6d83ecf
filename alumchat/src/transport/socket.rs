//! WebSocket channel to the live messaging endpoint.
//!
//! One [`SocketChannel`] owns one logical connection per authenticated
//! session. On unexpected closure the supervisor task retries the connect
//! after a fixed delay, indefinitely, with no backoff growth and no retry
//! cap — the chat feature is best-effort, and a quick reconnect is the
//! expected outcome. Events sent while disconnected are dropped, never
//! queued for the next connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use alumchat_proto::codec;
use alumchat_proto::event::WireEvent;

use super::{Channel, ChannelError, EventBus, EventCallback, Subscription};

/// Type alias for the write half of a WebSocket connection.
type WsSink = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Fixed delay between reconnection attempts.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// WebSocket implementation of the [`Channel`] trait.
///
/// Created via [`SocketChannel::new`] with the endpoint base URL (e.g.
/// `ws://host:port/ws`); [`connect`](Self::connect) appends the caller's
/// identity as a `userId` query parameter and starts the supervisor task.
pub struct SocketChannel {
    /// Endpoint base URL, without the `userId` parameter.
    endpoint: Url,
    /// Delay between reconnection attempts.
    reconnect_delay: Duration,
    /// Fan-out registry for inbound events.
    bus: Arc<EventBus>,
    /// Write half of the current connection, `None` while disconnected.
    writer: Arc<Mutex<Option<WsSink>>>,
    /// Whether a connection is currently open.
    connected: Arc<AtomicBool>,
    /// Whether the supervisor task has been started (idempotent connect).
    started: AtomicBool,
    /// Set by `disconnect` to stop the supervisor from reconnecting.
    shutdown: Arc<AtomicBool>,
}

impl SocketChannel {
    /// Creates a channel for the given endpoint base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidEndpoint`] if the URL does not parse.
    pub fn new(endpoint: &str, reconnect_delay: Duration) -> Result<Self, ChannelError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            reconnect_delay,
            bus: Arc::new(EventBus::new()),
            writer: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            started: AtomicBool::new(false),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Opens the connection, tagged with the caller's identity.
    ///
    /// Idempotent per process: a second call while the supervisor is
    /// already running is a no-op, so no duplicate connection is created.
    /// On every successful open the channel announces
    /// `{type:"status", isOnline:true}` before anything else.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, user_id: &str) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("connect called while channel already running, ignoring");
            return;
        }

        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("userId", user_id);

        tokio::spawn(supervise(
            url,
            self.reconnect_delay,
            Arc::clone(&self.bus),
            Arc::clone(&self.writer),
            Arc::clone(&self.connected),
            Arc::clone(&self.shutdown),
        ));
    }

    /// Announces `{type:"status", isOnline:false}`, then closes the
    /// connection. The supervisor will not reconnect afterwards.
    pub async fn disconnect(&self) {
        self.send(&WireEvent::offline()).await;
        self.shutdown.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut sink) = self.writer.lock().await.take() {
            let _ = sink.close().await;
        }
        tracing::info!("channel disconnected");
    }
}

impl Channel for SocketChannel {
    async fn send(&self, event: &WireEvent) {
        if !self.connected.load(Ordering::Relaxed) {
            // Fire-and-forget contract: no queuing, no error surfaced.
            tracing::debug!("channel closed, dropping outbound event");
            return;
        }

        let raw = match codec::encode(event) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(err = %e, "failed to encode outbound event");
                return;
            }
        };

        let mut writer = self.writer.lock().await;
        if let Some(sink) = writer.as_mut()
            && let Err(e) = sink.send(Message::Text(raw.into())).await
        {
            tracing::warn!(err = %e, "endpoint send failed");
            self.connected.store(false, Ordering::Relaxed);
        }
    }

    fn subscribe(&self, callback: EventCallback) -> Subscription {
        self.bus.subscribe(callback)
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

/// Supervisor task: connect, announce presence, pump frames, and on loss
/// sleep the fixed delay and try again until `shutdown` is set.
async fn supervise(
    url: Url,
    reconnect_delay: Duration,
    bus: Arc<EventBus>,
    writer: Arc<Mutex<Option<WsSink>>>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        match connect_async(url.as_str()).await {
            Ok((stream, _response)) => {
                tracing::info!(url = %url, "connected to messaging endpoint");
                let (sink, reader) = stream.split();
                *writer.lock().await = Some(sink);
                connected.store(true, Ordering::SeqCst);

                announce_online(&writer, &connected).await;
                pump_frames(reader, &bus).await;

                connected.store(false, Ordering::SeqCst);
                writer.lock().await.take();
            }
            Err(e) => {
                tracing::warn!(url = %url, err = %e, "endpoint connect failed");
            }
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(reconnect_delay).await;
    }
    tracing::info!("channel supervisor exiting");
}

/// Sends the online status announcement over a freshly opened connection.
async fn announce_online(writer: &Mutex<Option<WsSink>>, connected: &AtomicBool) {
    let raw = match codec::encode(&WireEvent::online()) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(err = %e, "failed to encode online announcement");
            return;
        }
    };
    let mut writer = writer.lock().await;
    if let Some(sink) = writer.as_mut()
        && let Err(e) = sink.send(Message::Text(raw.into())).await
    {
        tracing::warn!(err = %e, "failed to announce online status");
        connected.store(false, Ordering::SeqCst);
    }
}

/// Reads frames until the connection closes or errors out.
///
/// Malformed frames are logged and skipped — bad data from the endpoint
/// never tears down the connection or crashes a subscriber.
async fn pump_frames(mut reader: WsReader, bus: &EventBus) {
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(raw)) => match codec::decode(raw.as_str()) {
                Ok(event) => bus.publish(&event),
                Err(e) => {
                    tracing::warn!(err = %e, "malformed frame from endpoint, skipping");
                }
            },
            Ok(Message::Close(_)) => {
                tracing::info!("endpoint closed the connection");
                break;
            }
            Ok(Message::Binary(_) | Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {
                // The endpoint only speaks text frames; ignore the rest.
            }
            Err(e) => {
                tracing::warn!(err = %e, "endpoint read error");
                break;
            }
        }
    }
}
