use std::sync::Arc;

use dashmap::DashSet;

use super::LiveConnection;
use super::catalog;
use super::types::request::RoomRequest;
use crate::ws::connection::ConnectionState;

/// Server-side broadcast scopes a client can join.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomScope {
    /// Tournament-event room
    Event,
    /// Single-round room
    Round,
}

impl RoomScope {
    pub(crate) const fn join_wire(self) -> &'static str {
        match self {
            Self::Event => catalog::JOIN_EVENT,
            Self::Round => catalog::JOIN_ROUND,
        }
    }

    pub(crate) const fn leave_wire(self) -> &'static str {
        match self {
            Self::Event => catalog::LEAVE_EVENT,
            Self::Round => catalog::LEAVE_ROUND,
        }
    }
}

/// A joined broadcast group.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Room {
    pub scope: RoomScope,
    pub id: String,
}

impl Room {
    #[must_use]
    pub fn new(scope: RoomScope, id: String) -> Self {
        Self { scope, id }
    }
}

/// Tracks joined rooms and keeps the server's view consistent across
/// reconnects.
///
/// Join and leave are idempotent: a duplicate join produces no second
/// announcement, leaving an untracked room does nothing, and an empty id is
/// ignored outright. The tracked set is application state; it survives
/// transport drops and is re-announced, once per room, when the connection
/// recovers.
pub struct RoomRegistry {
    connection: LiveConnection,
    joined: DashSet<Room>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(connection: LiveConnection) -> Self {
        Self {
            connection,
            joined: DashSet::new(),
        }
    }

    /// Join a room, lazily connecting first. No-op for empty ids and rooms
    /// already joined.
    pub fn join(&self, scope: RoomScope, id: &str) {
        if id.is_empty() {
            tracing::debug!(?scope, "ignoring join with empty room id");
            return;
        }

        self.connection.connect();

        let room = Room::new(scope, id.to_owned());
        if self.joined.insert(room) {
            tracing::debug!(?scope, id, "joining room");
            if let Err(e) = self.connection.send(&RoomRequest::join(scope, id)) {
                tracing::warn!(?scope, id, error = %e, "failed to queue join announcement");
            }
        }
    }

    /// Leave a room. No-op for empty ids and rooms not currently joined.
    pub fn leave(&self, scope: RoomScope, id: &str) {
        if id.is_empty() {
            return;
        }

        let room = Room::new(scope, id.to_owned());
        if self.joined.remove(&room).is_some() {
            tracing::debug!(?scope, id, "leaving room");
            if let Err(e) = self.connection.send(&RoomRequest::leave(scope, id)) {
                tracing::warn!(?scope, id, error = %e, "failed to queue leave announcement");
            }
        }
    }

    /// Whether the given room is currently tracked as joined.
    #[must_use]
    pub fn contains(&self, scope: RoomScope, id: &str) -> bool {
        self.joined.contains(&Room::new(scope, id.to_owned()))
    }

    /// Snapshot of every tracked room, in arbitrary order.
    #[must_use]
    pub fn joined_rooms(&self) -> Vec<Room> {
        self.joined.iter().map(|room| room.key().clone()).collect()
    }

    /// Number of tracked rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.joined.len()
    }

    /// Start the handler that re-announces tracked rooms when the connection
    /// recovers from a drop.
    pub fn start_reconnection_handler(self: &Arc<Self>) {
        let this = Arc::clone(self);

        tokio::spawn(async move {
            let mut state_rx = this.connection.state_receiver();
            let mut was_connected = state_rx.borrow().is_connected();

            loop {
                // Wait for next state change
                if state_rx.changed().await.is_err() {
                    // Channel closed, connection manager is gone
                    break;
                }

                let state = *state_rx.borrow_and_update();

                if let ConnectionState::Connected { .. } = state {
                    if was_connected {
                        // Recovered from a drop; first-connect joins were
                        // already queued by join() itself
                        tracing::debug!("connection recovered, re-announcing room memberships");
                        this.rejoin_all();
                    }
                    was_connected = true;
                }
                // Disconnected is not terminal here: an explicit connect()
                // can revive the loop, so keep watching.
            }
        });
    }

    /// Queue a join announcement for every tracked room, exactly once each.
    fn rejoin_all(&self) {
        for room in self.joined.iter() {
            if let Err(e) = self.connection.send(&RoomRequest::join(room.scope, &room.id)) {
                tracing::warn!(
                    scope = ?room.scope,
                    id = %room.id,
                    error = %e,
                    "failed to queue rejoin announcement"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::EnvelopeParser;
    use crate::ws::ConnectionManager;
    use crate::ws::config::Config;

    // The registry never connects on its own during these tests: the
    // endpoint is unreachable and the lazy loop fails in the background
    // while the tracked set is exercised synchronously.
    fn registry() -> RoomRegistry {
        let mut config = Config::default();
        config.reconnect.max_attempts = Some(1);
        config.reconnect.delay = std::time::Duration::from_millis(10);
        let connection =
            ConnectionManager::new("ws://127.0.0.1:1".to_owned(), config, EnvelopeParser);
        RoomRegistry::new(connection)
    }

    #[tokio::test]
    async fn duplicate_joins_track_single_membership() {
        let rooms = registry();

        rooms.join(RoomScope::Event, "e1");
        rooms.join(RoomScope::Event, "e1");
        rooms.join(RoomScope::Event, "e1");

        assert_eq!(rooms.room_count(), 1);
        assert!(rooms.contains(RoomScope::Event, "e1"));
    }

    #[tokio::test]
    async fn join_leave_join_matches_single_join() {
        let rooms = registry();

        rooms.join(RoomScope::Round, "r1");
        rooms.leave(RoomScope::Round, "r1");
        rooms.join(RoomScope::Round, "r1");

        assert_eq!(rooms.room_count(), 1);
        assert!(rooms.contains(RoomScope::Round, "r1"));
    }

    #[tokio::test]
    async fn empty_id_join_is_a_noop() {
        let rooms = registry();

        rooms.join(RoomScope::Event, "");
        rooms.join(RoomScope::Round, "");

        assert_eq!(rooms.room_count(), 0);
    }

    #[tokio::test]
    async fn leaving_untracked_room_is_a_noop() {
        let rooms = registry();

        rooms.leave(RoomScope::Event, "never-joined");
        rooms.leave(RoomScope::Round, "");

        assert_eq!(rooms.room_count(), 0);
    }

    #[tokio::test]
    async fn scopes_are_independent() {
        let rooms = registry();

        rooms.join(RoomScope::Event, "x");
        rooms.join(RoomScope::Round, "x");

        assert_eq!(rooms.room_count(), 2);

        rooms.leave(RoomScope::Event, "x");
        assert!(!rooms.contains(RoomScope::Event, "x"));
        assert!(rooms.contains(RoomScope::Round, "x"));
    }
}
