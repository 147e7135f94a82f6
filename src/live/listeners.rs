use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;

use super::types::response::LiveMessage;

/// Callback invoked with the payload of a named wire event.
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Capability to remove exactly one listener registration.
///
/// Returned by [`ListenerRegistry::on`]; removing it never affects sibling
/// registrations on the same event name. Using it twice is a no-op.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    event: String,
    token: u64,
}

impl ListenerHandle {
    /// The wire event name this handle is registered for.
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }
}

/// Named-event pub/sub registry over the single live connection.
///
/// Listener registrations are application state: they survive transport
/// disconnects and are only removed through their handle or
/// [`remove_all_listeners`](Self::remove_all_listeners).
#[derive(Default)]
pub struct ListenerRegistry {
    /// Event name -> registrations, each tagged with a unique token
    listeners: DashMap<String, Vec<(u64, EventCallback)>>,
    next_token: AtomicU64,
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event` and return its unsubscribe capability.
    ///
    /// The same closure registered twice produces two independent
    /// registrations, each with its own handle.
    pub fn on(&self, event: &str, callback: EventCallback) -> ListenerHandle {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .entry(event.to_owned())
            .or_default()
            .push((token, callback));

        tracing::debug!(event, token, "registered listener");
        ListenerHandle {
            event: event.to_owned(),
            token,
        }
    }

    /// Remove exactly the registration behind `handle`.
    ///
    /// Sibling registrations on the same event name are unaffected; a stale
    /// handle is a no-op.
    pub fn off(&self, handle: &ListenerHandle) {
        if let Some(mut entry) = self.listeners.get_mut(&handle.event) {
            entry.retain(|(token, _)| *token != handle.token);
        }
    }

    /// Clear every registration for `event`, or the whole registry when
    /// `event` is `None` (full app teardown, not normal navigation).
    pub fn remove_all_listeners(&self, event: Option<&str>) {
        match event {
            Some(event) => {
                self.listeners.remove(event);
            }
            None => self.listeners.clear(),
        }
    }

    /// Number of live registrations for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |entry| entry.len())
    }

    /// Invoke every registration for the message's event name, exactly once
    /// each, with the message payload.
    pub fn dispatch(&self, message: &LiveMessage) {
        // Snapshot the callbacks so no shard lock is held while they run;
        // a callback may re-enter the registry.
        let callbacks: Vec<EventCallback> = match self.listeners.get(&message.event) {
            Some(entry) => entry.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return,
        };

        for callback in callbacks {
            callback(&message.data);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;

    fn message(event: &str, data: Value) -> LiveMessage {
        LiveMessage::builder().event(event.to_owned()).data(data).build()
    }

    fn counting_callback(counter: &Arc<AtomicUsize>) -> EventCallback {
        let counter = Arc::clone(counter);
        Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn dispatch_invokes_registered_callback_with_payload() {
        let registry = ListenerRegistry::new();
        let seen: Arc<std::sync::Mutex<Option<Value>>> = Arc::default();

        let sink = Arc::clone(&seen);
        let _handle = registry.on(
            "debate:result",
            Arc::new(move |payload| {
                *sink.lock().expect("not poisoned") = Some(payload.clone());
            }),
        );

        let payload = json!({ "debateId": "d1", "winnerId": "u1" });
        registry.dispatch(&message("debate:result", payload.clone()));

        assert_eq!(seen.lock().expect("not poisoned").take(), Some(payload));
    }

    #[test]
    fn unsubscribed_callback_never_fires() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let handle = registry.on("checkin:update", counting_callback(&count));
        registry.off(&handle);

        registry.dispatch(&message("checkin:update", json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unsubscribing_one_sibling_leaves_the_other() {
        let registry = ListenerRegistry::new();
        let count1 = Arc::new(AtomicUsize::new(0));
        let count2 = Arc::new(AtomicUsize::new(0));

        let handle1 = registry.on("round:status", counting_callback(&count1));
        let _handle2 = registry.on("round:status", counting_callback(&count2));

        registry.off(&handle1);
        registry.dispatch(&message("round:status", json!({})));

        assert_eq!(count1.load(Ordering::SeqCst), 0);
        assert_eq!(count2.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn each_registration_fires_exactly_once_per_message() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        // Same closure registered twice is two registrations
        let _h1 = registry.on("checkin:count", counting_callback(&count));
        let _h2 = registry.on("checkin:count", counting_callback(&count));

        registry.dispatch(&message("checkin:count", json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 2);

        registry.dispatch(&message("checkin:count", json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn double_off_is_a_noop() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let handle = registry.on("round:created", counting_callback(&count));
        let sibling = registry.on("round:created", counting_callback(&count));

        registry.off(&handle);
        registry.off(&handle);

        registry.dispatch(&message("round:created", json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 1, "sibling still registered");
        assert_eq!(registry.listener_count("round:created"), 1);
        drop(sibling);
    }

    #[test]
    fn remove_all_listeners_for_one_event() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let _h1 = registry.on("user:updated", counting_callback(&count));
        let _h2 = registry.on("user:updated", counting_callback(&count));
        let _h3 = registry.on("user:deleted", counting_callback(&count));

        registry.remove_all_listeners(Some("user:updated"));

        assert_eq!(registry.listener_count("user:updated"), 0);
        assert_eq!(registry.listener_count("user:deleted"), 1);
    }

    #[test]
    fn remove_all_listeners_clears_registry() {
        let registry = ListenerRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let _h1 = registry.on("event:created", counting_callback(&count));
        let _h2 = registry.on("event:deleted", counting_callback(&count));

        registry.remove_all_listeners(None);

        registry.dispatch(&message("event:created", json!({})));
        registry.dispatch(&message("event:deleted", json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispatch_without_listeners_is_a_noop() {
        let registry = ListenerRegistry::new();
        registry.dispatch(&message("leaderboard:update", json!({})));
    }

    #[test]
    fn callback_may_reenter_the_registry() {
        let registry = Arc::new(ListenerRegistry::new());
        let count = Arc::new(AtomicUsize::new(0));

        let reentrant = Arc::clone(&registry);
        let inner_count = Arc::clone(&count);
        let _handle = registry.on(
            "pairings:generated",
            Arc::new(move |_| {
                // Registering from inside a dispatch must not deadlock
                let _new = reentrant.on("rooms:allocated", counting_callback(&inner_count));
            }),
        );

        registry.dispatch(&message("pairings:generated", json!({})));
        assert_eq!(registry.listener_count("rooms:allocated"), 1);
    }
}
