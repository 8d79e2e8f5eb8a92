//! Event-capability shapes
//!
//! An object under test can expose its events through one of three method
//! pair conventions. Each convention is a trait; [`EventSource`] lets a
//! target advertise which of them it implements, and [`Shape::probe`] picks
//! the one to use in a fixed priority order:
//!
//! 1. [`Emitter`]: `on` / `off`
//! 2. [`EventTarget`]: `add_event_listener` / `remove_event_listener`
//! 3. [`ListenerList`]: `add_listener` / `remove_listener`
//!
//! Emitter comes first so a target that is both an emitter and a DOM-style
//! node is always driven through its emitter events.

pub mod emitter;

pub use emitter::EventEmitter;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

/// Names of the lifecycle events emitted by a recording panel
pub mod names {
    pub const UI_START_RECORDING: &str = "ui-start-recording";
    pub const UI_STOP_RECORDING: &str = "ui-stop-recording";
    pub const RECORDING_WILL_START: &str = "recording-will-start";
    pub const RECORDING_STARTED: &str = "recording-started";
    pub const RECORDING_WILL_STOP: &str = "recording-will-stop";
    pub const RECORDING_STOPPED: &str = "recording-stopped";
    pub const UI_STATE_CHANGED: &str = "ui-state-changed";
    pub const OVERVIEW_RENDERED: &str = "overview-rendered";
    pub const MARKERS_GRAPH_RENDERED: &str = "markers-graph-rendered";
    pub const MEMORY_GRAPH_RENDERED: &str = "memory-graph-rendered";
    pub const FRAMERATE_GRAPH_RENDERED: &str = "framerate-graph-rendered";
    pub const WATERFALL_RENDERED: &str = "waterfall-rendered";
    pub const JS_CALL_TREE_RENDERED: &str = "js-call-tree-rendered";
    pub const JS_FLAMEGRAPH_RENDERED: &str = "js-flamegraph-rendered";
    pub const MEMORY_CALL_TREE_RENDERED: &str = "memory-call-tree-rendered";
    pub const MEMORY_FLAMEGRAPH_RENDERED: &str = "memory-flamegraph-rendered";
}

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registered listener, used to deregister it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        Self(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A callback invoked with the arguments an event was fired with
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    callback: Arc<dyn Fn(&[Value]) + Send + Sync>,
}

impl Listener {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self::with_id(ListenerId::next(), callback)
    }

    /// Build a listener under an id allocated beforehand, so the callback
    /// can refer to its own registration
    pub fn with_id<F>(id: ListenerId, callback: F) -> Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        Self {
            id,
            callback: Arc::new(callback),
        }
    }

    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn call(&self, args: &[Value]) {
        (self.callback)(args)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

/// Emitter-style `on` / `off`
pub trait Emitter: Send + Sync {
    fn on(&self, event: &str, listener: Listener);
    fn off(&self, event: &str, id: ListenerId);
}

/// DOM-style `addEventListener` / `removeEventListener`
pub trait EventTarget: Send + Sync {
    fn add_event_listener(&self, event: &str, listener: Listener, use_capture: bool);
    fn remove_event_listener(&self, event: &str, id: ListenerId, use_capture: bool);
}

/// Listener-list style `addListener` / `removeListener`
pub trait ListenerList: Send + Sync {
    fn add_listener(&self, event: &str, listener: Listener);
    fn remove_listener(&self, event: &str, id: ListenerId);
}

/// An object whose events can be waited on
///
/// Implementors override the accessor for every shape they support; the
/// defaults report the shape as missing.
pub trait EventSource: Send + Sync {
    fn as_emitter(&self) -> Option<&dyn Emitter> {
        None
    }

    fn as_event_target(&self) -> Option<&dyn EventTarget> {
        None
    }

    fn as_listener_list(&self) -> Option<&dyn ListenerList> {
        None
    }
}

/// One of the three registration conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Emitter,
    EventTarget,
    ListenerList,
}

impl Shape {
    /// Probe order, highest priority first
    pub const PRIORITY: [Shape; 3] = [Shape::Emitter, Shape::EventTarget, Shape::ListenerList];

    /// First shape the source supports, in [`Shape::PRIORITY`] order
    pub fn probe(source: &dyn EventSource) -> Option<Shape> {
        Self::PRIORITY
            .into_iter()
            .find(|shape| shape.is_supported_by(source))
    }

    pub fn is_supported_by(self, source: &dyn EventSource) -> bool {
        match self {
            Shape::Emitter => source.as_emitter().is_some(),
            Shape::EventTarget => source.as_event_target().is_some(),
            Shape::ListenerList => source.as_listener_list().is_some(),
        }
    }

    /// Register `listener` through this shape. Returns false if the source
    /// does not support it.
    pub fn subscribe(
        self,
        source: &dyn EventSource,
        event: &str,
        listener: Listener,
        use_capture: bool,
    ) -> bool {
        match self {
            Shape::Emitter => source.as_emitter().map(|e| e.on(event, listener)),
            Shape::EventTarget => source
                .as_event_target()
                .map(|t| t.add_event_listener(event, listener, use_capture)),
            Shape::ListenerList => source
                .as_listener_list()
                .map(|l| l.add_listener(event, listener)),
        }
        .is_some()
    }

    /// Deregister the listener with `id` through this shape
    pub fn unsubscribe(self, source: &dyn EventSource, event: &str, id: ListenerId, use_capture: bool) {
        match self {
            Shape::Emitter => {
                if let Some(e) = source.as_emitter() {
                    e.off(event, id);
                }
            }
            Shape::EventTarget => {
                if let Some(t) = source.as_event_target() {
                    t.remove_event_listener(event, id, use_capture);
                }
            }
            Shape::ListenerList => {
                if let Some(l) = source.as_listener_list() {
                    l.remove_listener(event, id);
                }
            }
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emitter => write!(f, "on/off"),
            Self::EventTarget => write!(f, "addEventListener/removeEventListener"),
            Self::ListenerList => write!(f, "addListener/removeListener"),
        }
    }
}
