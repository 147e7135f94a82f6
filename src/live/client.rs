use std::sync::Arc;

use serde_json::Value;

use super::binding::{BindingSession, RoomHandlers};
use super::catalog;
use super::listeners::{ListenerHandle, ListenerRegistry};
use super::rooms::{Room, RoomRegistry, RoomScope};
use super::{EnvelopeParser, LiveConnection};
use crate::ws::config::Config;
use crate::ws::connection::ConnectionState;
use crate::ws::error::WsError;

/// Handle to the shared live connection.
///
/// Cloning is cheap and every clone refers to the same connection, room set
/// and listener registry; the application is expected to create one client
/// and pass clones around. Construction does not open the socket: the first
/// [`connect`](Self::connect), room join or listener registration does.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    connection: LiveConnection,
    rooms: Arc<RoomRegistry>,
    listeners: Arc<ListenerRegistry>,
}

impl Client {
    /// Create a client for a WebSocket endpoint such as `wss://host`.
    ///
    /// Must be called inside a Tokio runtime; the dispatch and rejoin tasks
    /// are spawned immediately even though the socket stays closed until
    /// first use.
    #[must_use]
    pub fn new(endpoint: &str, config: Config) -> Self {
        let connection = LiveConnection::new(endpoint.to_owned(), config, EnvelopeParser);
        let rooms = Arc::new(RoomRegistry::new(connection.clone()));
        let listeners = Arc::new(ListenerRegistry::new());

        rooms.start_reconnection_handler();
        Self::start_dispatch(&connection, &listeners);

        Self {
            inner: Arc::new(ClientInner {
                connection,
                rooms,
                listeners,
            }),
        }
    }

    /// Create a client from the HTTP API origin, deriving the socket
    /// endpoint via [`socket_origin`](crate::socket_origin).
    pub fn from_api_origin(api_origin: &str, config: Config) -> crate::Result<Self> {
        let endpoint = crate::socket_origin(api_origin)?;
        Ok(Self::new(&endpoint, config))
    }

    /// Forward every inbound message to the listener registry.
    fn start_dispatch(connection: &LiveConnection, listeners: &Arc<ListenerRegistry>) {
        let mut messages = connection.subscribe();
        let listeners = Arc::clone(listeners);

        tokio::spawn(async move {
            loop {
                match messages.recv().await {
                    Ok(message) => listeners.dispatch(&message),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(count)) => {
                        tracing::warn!(
                            error = %WsError::Lagged { count },
                            "dispatch fell behind, dropping messages"
                        );
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// Open the connection if it is not already open or opening.
    ///
    /// Safe to call repeatedly; concurrent calls share one attempt. Also
    /// restarts a connection whose retry budget was exhausted.
    pub fn connect(&self) {
        self.inner.connection.connect();
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.connection.is_connected()
    }

    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Join the tournament-event room for `event_id`.
    pub fn join_event(&self, event_id: &str) {
        self.join_room(RoomScope::Event, event_id);
    }

    /// Leave the tournament-event room for `event_id`.
    pub fn leave_event(&self, event_id: &str) {
        self.leave_room(RoomScope::Event, event_id);
    }

    /// Join the round room for `round_id`.
    pub fn join_round(&self, round_id: &str) {
        self.join_room(RoomScope::Round, round_id);
    }

    /// Leave the round room for `round_id`.
    pub fn leave_round(&self, round_id: &str) {
        self.leave_room(RoomScope::Round, round_id);
    }

    pub(crate) fn join_room(&self, scope: RoomScope, id: &str) {
        self.inner.rooms.join(scope, id);
    }

    pub(crate) fn leave_room(&self, scope: RoomScope, id: &str) {
        self.inner.rooms.leave(scope, id);
    }

    /// Snapshot of the rooms currently tracked as joined.
    #[must_use]
    pub fn joined_rooms(&self) -> Vec<Room> {
        self.inner.rooms.joined_rooms()
    }

    /// Register a listener for a named wire event and lazily connect.
    ///
    /// The returned handle removes exactly this registration; siblings on
    /// the same event name are independent.
    pub fn on<F>(&self, event: &str, callback: F) -> ListenerHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.connection.connect();
        self.inner.listeners.on(event, Arc::new(callback))
    }

    /// Remove the registration behind `handle`. A stale handle is a no-op.
    pub fn off(&self, handle: &ListenerHandle) {
        self.inner.listeners.off(handle);
    }

    /// Drop every listener for `event`, or all listeners when `None`.
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        self.inner.listeners.remove_all_listeners(event);
    }

    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.listener_count(event)
    }

    /// Bind an event-scoped room: joins it (when `event_id` is set) and
    /// subscribes the handlers to the full event-room catalog.
    #[must_use]
    pub fn bind_event_room(&self, event_id: Option<&str>, handlers: RoomHandlers) -> BindingSession {
        BindingSession::new(
            self.clone(),
            RoomScope::Event,
            catalog::EVENT_ROOM_CATALOG,
            event_id,
            handlers,
        )
    }

    /// Bind a round-scoped room: joins it (when `round_id` is set) and
    /// subscribes the handlers to the full round-room catalog.
    #[must_use]
    pub fn bind_round_room(&self, round_id: Option<&str>, handlers: RoomHandlers) -> BindingSession {
        BindingSession::new(
            self.clone(),
            RoomScope::Round,
            catalog::ROUND_ROOM_CATALOG,
            round_id,
            handlers,
        )
    }
}
