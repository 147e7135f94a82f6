use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

use super::client::Client;
use super::listeners::{EventCallback, ListenerHandle};
use super::rooms::RoomScope;

/// Named callbacks for a room binding, keyed by wire event name.
///
/// Only names present in the binding's catalog are ever delivered; handlers
/// for other names are silently ignored.
#[derive(Default)]
pub struct RoomHandlers {
    inner: HashMap<&'static str, EventCallback>,
}

impl RoomHandlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler for one wire event name.
    #[must_use]
    pub fn on<F>(mut self, event: &'static str, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.insert(event, Arc::new(callback));
        self
    }
}

/// Handler indirection cell shared between a session and its subscriptions.
type HandlerCell = Arc<RwLock<HashMap<&'static str, EventCallback>>>;

/// The lifetime-scoped association between one consumer, one room id, and
/// the listener subscriptions it owns.
///
/// While a room id is set the session holds one listener registration per
/// catalog event, each dispatching through the *current* handler map, so
/// handlers can be swapped via [`set_handlers`](Self::set_handlers) without
/// resubscribing. Changing the room id tears the previous room down
/// completely (every subscription removed, room left) before the new one is
/// set up; dropping the session does the same.
pub struct BindingSession {
    client: Client,
    scope: RoomScope,
    catalog: &'static [&'static str],
    handlers: HandlerCell,
    active: Option<ActiveRoom>,
}

struct ActiveRoom {
    room_id: String,
    subscriptions: Vec<ListenerHandle>,
}

impl BindingSession {
    pub(crate) fn new(
        client: Client,
        scope: RoomScope,
        catalog: &'static [&'static str],
        room_id: Option<&str>,
        handlers: RoomHandlers,
    ) -> Self {
        let mut session = Self {
            client,
            scope,
            catalog,
            handlers: Arc::new(RwLock::new(handlers.inner)),
            active: None,
        };
        session.set_room(room_id);
        session
    }

    /// Point the session at a different room, or deactivate it with `None`.
    ///
    /// An id change is a full teardown of the previous room followed by a
    /// setup of the new one, never an incremental diff. Setting the current
    /// id again is a no-op; an empty id counts as `None`.
    pub fn set_room(&mut self, room_id: Option<&str>) {
        let room_id = room_id.filter(|id| !id.is_empty());

        if self.active.as_ref().map(|active| active.room_id.as_str()) == room_id {
            return;
        }

        self.teardown();
        if let Some(id) = room_id {
            self.activate(id);
        }
    }

    /// Replace the handler map without touching subscriptions.
    ///
    /// Subsequent messages dispatch through the new handlers immediately.
    pub fn set_handlers(&self, handlers: RoomHandlers) {
        // We can recover from a poisoned lock because the map has no
        // inconsistent intermediate state.
        *self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner) = handlers.inner;
    }

    /// The currently bound room id, if any.
    #[must_use]
    pub fn room_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.room_id.as_str())
    }

    /// Whether the session currently holds a room.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn activate(&mut self, room_id: &str) {
        self.client.join_room(self.scope, room_id);

        let mut subscriptions = Vec::with_capacity(self.catalog.len());
        for &event in self.catalog {
            let cell = Arc::clone(&self.handlers);
            let handle = self.client.on(event, move |payload| {
                // Look up the current handler on every message so callers can
                // swap handlers without resubscribing. The handler is cloned
                // out before invocation to avoid holding the lock across it.
                let handler = cell
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get(event)
                    .cloned();
                if let Some(handler) = handler {
                    handler(payload);
                }
            });
            subscriptions.push(handle);
        }

        tracing::debug!(scope = ?self.scope, room_id, "binding session activated");
        self.active = Some(ActiveRoom {
            room_id: room_id.to_owned(),
            subscriptions,
        });
    }

    fn teardown(&mut self) {
        if let Some(active) = self.active.take() {
            for handle in &active.subscriptions {
                self.client.off(handle);
            }
            self.client.leave_room(self.scope, &active.room_id);
            tracing::debug!(
                scope = ?self.scope,
                room_id = %active.room_id,
                "binding session torn down"
            );
        }
    }
}

impl Drop for BindingSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
