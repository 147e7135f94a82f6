#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use backoff::backoff::Backoff as _;
use futures::{SinkExt as _, StreamExt as _};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, sleep, timeout};
use tokio_tungstenite::tungstenite::{Bytes, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::config::Config;
use super::error::WsError;
use crate::error::Kind;
use crate::ws::traits::MessageParser;
use crate::{Result, error::Error};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Broadcast channel capacity for incoming messages.
const BROADCAST_CAPACITY: usize = 1024;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Successfully connected
    Connected {
        /// When the connection was established
        since: Instant,
    },
    /// Reconnecting after failure
    Reconnecting {
        /// Current reconnection attempt number
        attempt: u32,
    },
}

impl ConnectionState {
    /// Check if the connection is currently active.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Everything the connection loop consumes. Held until the first `connect()`
/// call and put back when the loop gives up, so a later explicit `connect()`
/// starts a fresh loop.
struct ConnectionSeed<P> {
    endpoint: String,
    config: Config,
    parser: P,
    sender_rx: mpsc::UnboundedReceiver<String>,
}

/// Manages WebSocket connection lifecycle, reconnection, and heartbeat.
///
/// Exactly one transport connection is kept alive per manager, shared by every
/// consumer holding a clone. Construction is side-effect free: the connection
/// loop starts on the first [`connect`](Self::connect) call, reconnects with a
/// bounded fixed-delay policy, and parks in [`ConnectionState::Disconnected`]
/// once the attempt budget is exhausted.
///
/// Outbound messages sent while disconnected queue in an unbounded channel and
/// flush once the transport is up; they are never dropped by this layer.
///
/// # Type Parameters
///
/// - `M`: Message type that implements [`DeserializeOwned`] among other "helper" types
/// - `P`: Parser type that implements [`MessageParser<M>`]
pub struct ConnectionManager<M, P>
where
    M: DeserializeOwned + Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    /// Watch channel sender for state changes (enables reconnection detection)
    state_tx: watch::Sender<ConnectionState>,
    /// Watch channel receiver for state changes (for use in checking the current state)
    state_rx: watch::Receiver<ConnectionState>,
    /// Sender channel for outgoing messages
    sender_tx: mpsc::UnboundedSender<String>,
    /// Broadcast sender for incoming messages
    broadcast_tx: broadcast::Sender<M>,
    /// Loop inputs; `None` while the connection loop is running
    seed: Arc<Mutex<Option<ConnectionSeed<P>>>>,
}

impl<M, P> Clone for ConnectionManager<M, P>
where
    M: DeserializeOwned + Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    fn clone(&self) -> Self {
        Self {
            state_tx: self.state_tx.clone(),
            state_rx: self.state_rx.clone(),
            sender_tx: self.sender_tx.clone(),
            broadcast_tx: self.broadcast_tx.clone(),
            seed: Arc::clone(&self.seed),
        }
    }
}

impl<M, P> ConnectionManager<M, P>
where
    M: DeserializeOwned + Debug + Clone + Send + 'static,
    P: MessageParser<M>,
{
    /// Create a new connection manager without connecting.
    ///
    /// The `parser` is used to deserialize incoming WebSocket messages once
    /// the loop is started via [`connect`](Self::connect).
    pub fn new(endpoint: String, config: Config, parser: P) -> Self {
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        Self {
            state_tx,
            state_rx,
            sender_tx,
            broadcast_tx,
            seed: Arc::new(Mutex::new(Some(ConnectionSeed {
                endpoint,
                config,
                parser,
                sender_rx,
            }))),
        }
    }

    /// Start the connection loop if it is not already running.
    ///
    /// The first call spawns the loop; subsequent calls while the loop is live
    /// are no-ops, so racing `connect()` calls still produce a single
    /// underlying connection. After the reconnect budget is exhausted the loop
    /// exits and a later `connect()` starts over.
    pub fn connect(&self) {
        // We can recover from a poisoned lock because Option<ConnectionSeed> has
        // no inconsistent intermediate state.
        let seed = self
            .seed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(seed) = seed else {
            tracing::debug!("connection loop already running, connect() is a no-op");
            return;
        };

        let broadcast_tx = self.broadcast_tx.clone();
        let state_tx = self.state_tx.clone();
        let slot = Arc::clone(&self.seed);

        tokio::spawn(async move {
            Self::connection_loop(seed, broadcast_tx, state_tx, slot).await;
        });
    }

    /// Main connection loop with bounded fixed-delay reconnection.
    async fn connection_loop(
        mut seed: ConnectionSeed<P>,
        broadcast_tx: broadcast::Sender<M>,
        state_tx: watch::Sender<ConnectionState>,
        slot: Arc<Mutex<Option<ConnectionSeed<P>>>>,
    ) {
        let mut attempt = 0_u32;
        let mut backoff: backoff::ExponentialBackoff = seed.config.reconnect.clone().into();

        loop {
            let state_rx = state_tx.subscribe();

            _ = state_tx.send(ConnectionState::Connecting);

            // Attempt connection, bounded by the configured timeout
            match timeout(seed.config.connect_timeout, connect_async(&seed.endpoint)).await {
                Ok(Ok((ws_stream, _))) => {
                    attempt = 0;
                    backoff.reset();
                    _ = state_tx.send(ConnectionState::Connected {
                        since: Instant::now(),
                    });

                    // Handle connection
                    if let Err(e) = Self::handle_connection(
                        ws_stream,
                        &mut seed.sender_rx,
                        &broadcast_tx,
                        state_rx,
                        seed.config.clone(),
                        &seed.parser,
                    )
                    .await
                    {
                        tracing::warn!(error = %e, "connection dropped");
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, endpoint = %seed.endpoint, "unable to connect");
                    attempt = attempt.saturating_add(1);
                }
                Err(_) => {
                    tracing::warn!(
                        timeout = ?seed.config.connect_timeout,
                        endpoint = %seed.endpoint,
                        "connection attempt timed out"
                    );
                    attempt = attempt.saturating_add(1);
                }
            }

            // Check if we should stop reconnecting
            if let Some(max) = seed.config.reconnect.max_attempts
                && attempt >= max
            {
                _ = state_tx.send(ConnectionState::Disconnected);
                break;
            }

            // Update state and wait out the fixed delay
            _ = state_tx.send(ConnectionState::Reconnecting { attempt });

            if let Some(duration) = backoff.next_backoff() {
                sleep(duration).await;
            }
        }

        // Re-arm so an explicit connect() can start a fresh loop
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(seed);
    }

    /// Handle an active WebSocket connection.
    async fn handle_connection(
        ws_stream: WsStream,
        sender_rx: &mut mpsc::UnboundedReceiver<String>,
        broadcast_tx: &broadcast::Sender<M>,
        state_rx: watch::Receiver<ConnectionState>,
        config: Config,
        parser: &P,
    ) -> Result<()> {
        let (mut write, mut read) = ws_stream.split();

        // Channel to notify heartbeat loop when a pong frame arrives
        let (pong_tx, pong_rx) = watch::channel(Instant::now());
        let (ping_tx, mut ping_rx) = mpsc::unbounded_channel();

        let heartbeat_handle = tokio::spawn(async move {
            Self::heartbeat_loop(ping_tx, state_rx, &config, pong_rx).await;
        });

        loop {
            tokio::select! {
                // Handle incoming messages
                Some(msg) = read.next() => {
                    match msg {
                        Ok(Message::Text(text)) => {
                            tracing::trace!(%text, "received WebSocket text message");

                            // Parse messages using the provided parser
                            match parser.parse(text.as_bytes()) {
                                Ok(messages) => {
                                    for message in messages {
                                        tracing::trace!(?message, "parsed WebSocket message");
                                        _ = broadcast_tx.send(message);
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(%text, error = %e, "failed to parse WebSocket message");
                                }
                            }
                        }
                        Ok(Message::Ping(payload)) => {
                            if write.send(Message::Pong(payload)).await.is_err() {
                                break;
                            }
                        }
                        Ok(Message::Pong(_)) => {
                            _ = pong_tx.send(Instant::now());
                        }
                        Ok(Message::Close(_)) => {
                            heartbeat_handle.abort();
                            return Err(Error::with_source(
                                Kind::WebSocket,
                                WsError::ConnectionClosed,
                            ))
                        }
                        Err(e) => {
                            heartbeat_handle.abort();
                            return Err(Error::with_source(
                                Kind::WebSocket,
                                WsError::Connection(e),
                            ));
                        }
                        _ => {
                            // Ignore binary frames.
                        }
                    }
                }

                // Handle outgoing messages from the registries
                Some(text) = sender_rx.recv() => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }

                // Handle ping requests from heartbeat loop
                Some(()) = ping_rx.recv() => {
                    if write.send(Message::Ping(Bytes::new())).await.is_err() {
                        break;
                    }
                }

                // Check if connection is still active
                else => {
                    break;
                }
            }
        }

        // Cleanup
        heartbeat_handle.abort();

        Ok(())
    }

    /// Heartbeat loop that sends ping frames and monitors pong responses.
    async fn heartbeat_loop(
        ping_tx: mpsc::UnboundedSender<()>,
        state_rx: watch::Receiver<ConnectionState>,
        config: &Config,
        mut pong_rx: watch::Receiver<Instant>,
    ) {
        let mut ping_interval = interval(config.heartbeat_interval);

        loop {
            ping_interval.tick().await;

            // Check if still connected
            if !state_rx.borrow().is_connected() {
                break;
            }

            // Mark current pong state as seen before sending a ping
            // This prevents changed() from returning immediately due to a stale pong
            drop(pong_rx.borrow_and_update());

            // Send ping request to message loop
            let ping_sent = Instant::now();
            if ping_tx.send(()).is_err() {
                // Message loop has terminated
                break;
            }

            // Wait for pong within timeout
            let pong_result = timeout(config.heartbeat_timeout, pong_rx.changed()).await;

            match pong_result {
                Ok(Ok(())) => {
                    let last_pong = *pong_rx.borrow_and_update();
                    if last_pong < ping_sent {
                        tracing::debug!(
                            "pong received but older than last ping, connection may be stale"
                        );
                        break;
                    }
                }
                Ok(Err(_)) => {
                    // Channel closed, connection is terminating
                    break;
                }
                Err(_) => {
                    tracing::warn!(
                        "heartbeat timeout: no pong received within {:?}",
                        config.heartbeat_timeout
                    );
                    break;
                }
            }
        }
    }

    /// Queue a request for the WebSocket server.
    ///
    /// The request is serialized immediately and flushed once the transport is
    /// connected; it fails only when the manager itself has shut down.
    pub fn send<R: Serialize>(&self, request: &R) -> Result<()> {
        let json = serde_json::to_string(request)?;
        self.sender_tx
            .send(json)
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Whether the transport is currently up.
    ///
    /// Safe to call at any time, including before the first `connect()`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state_rx.borrow().is_connected()
    }

    /// Subscribe to incoming messages.
    ///
    /// Each call returns a new independent receiver. Multiple subscribers can
    /// receive messages concurrently without blocking each other.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<M> {
        self.broadcast_tx.subscribe()
    }

    /// Subscribe to connection state changes.
    ///
    /// Returns a receiver that notifies when the connection state changes.
    /// This is useful for detecting reconnections and re-announcing room
    /// memberships.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }
}
