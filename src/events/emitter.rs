//! In-process event emitter
//!
//! Listeners are snapshotted before they are invoked, so a listener may
//! deregister itself (or others) while an event is being emitted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use super::{Emitter, EventSource, Listener, ListenerId};

/// Named-event emitter exposing the `on` / `off` shape
#[derive(Debug, Default)]
pub struct EventEmitter {
    listeners: Mutex<HashMap<String, Vec<Listener>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<String, Vec<Listener>>> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fire `event`, invoking every listener registered at the moment of the
    /// call. Returns how many listeners were invoked.
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        let snapshot: Vec<Listener> = self.listeners().get(event).cloned().unwrap_or_default();

        tracing::trace!(event, listeners = snapshot.len(), "emit");
        for listener in &snapshot {
            listener.call(args);
        }
        snapshot.len()
    }

    /// Number of listeners currently registered for `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners().get(event).map_or(0, Vec::len)
    }
}

impl Emitter for EventEmitter {
    fn on(&self, event: &str, listener: Listener) {
        self.listeners()
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    fn off(&self, event: &str, id: ListenerId) {
        let mut listeners = self.listeners();
        if let Some(list) = listeners.get_mut(event) {
            list.retain(|l| l.id() != id);
            if list.is_empty() {
                listeners.remove(event);
            }
        }
    }
}

impl EventSource for EventEmitter {
    fn as_emitter(&self) -> Option<&dyn Emitter> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_emit_reaches_listeners_for_that_event_only() {
        let emitter = EventEmitter::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        emitter.on("rendered", Listener::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(emitter.emit("rendered", &[]), 1);
        assert_eq!(emitter.emit("stopped", &[]), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_removes_listener() {
        let emitter = EventEmitter::new();
        let listener = Listener::new(|_| {});
        let id = listener.id();
        emitter.on("rendered", listener);
        assert_eq!(emitter.listener_count("rendered"), 1);

        emitter.off("rendered", id);
        assert_eq!(emitter.listener_count("rendered"), 0);
        // Removing twice is harmless
        emitter.off("rendered", id);
    }

    #[test]
    fn test_listener_can_remove_itself_while_firing() {
        let emitter = Arc::new(EventEmitter::new());
        let seen = Arc::new(Mutex::new(Vec::new()));

        let id = ListenerId::next();
        let weak = Arc::downgrade(&emitter);
        let sink = seen.clone();
        emitter.on("tick", Listener::with_id(id, move |args| {
            if let Some(emitter) = weak.upgrade() {
                emitter.off("tick", id);
            }
            sink.lock().unwrap().push(args[0].clone());
        }));

        emitter.emit("tick", &[json!(1)]);
        emitter.emit("tick", &[json!(2)]);
        assert_eq!(*seen.lock().unwrap(), vec![json!(1)]);
        assert_eq!(emitter.listener_count("tick"), 0);
    }
}
