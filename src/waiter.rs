//! Waiting primitives
//!
//! Turns single event occurrences into futures and provides polling and
//! fixed-delay waits. None of these waits time out: callers that need a
//! bound race them with `tokio::time::timeout` or `tokio::select!`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::common::{Error, Result};
use crate::events::{EventSource, Listener, ListenerId, Shape};

/// Default interval between `wait_until` polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Options for [`once`]
#[derive(Debug, Clone, Copy, Default)]
pub struct OnceOptions {
    /// Register for the capture phase (DOM-style targets only)
    pub use_capture: bool,
    /// Resolve with every event argument as a JSON array instead of the first
    pub spread: bool,
}

/// A single future occurrence of an event
///
/// Resolves with the first event argument (`Value::Null` if the event carried
/// none) or, when spread, with all of them as a `Value::Array`. Dropping an
/// unresolved `Once` removes its listener from the target.
#[must_use = "the event is only observed when the future is awaited"]
pub struct Once {
    event: String,
    rx: oneshot::Receiver<Value>,
    abandoned: bool,
    settled: bool,
    registration: Registration,
}

/// Where a [`Once`] listener was registered
struct Registration {
    target: Weak<dyn EventSource>,
    shape: Shape,
    id: ListenerId,
    use_capture: bool,
}

impl Once {
    /// Name of the event being waited on
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl Future for Once {
    type Output = Value;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Value> {
        let this = self.get_mut();
        if this.abandoned {
            return Poll::Pending;
        }
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(value)) => {
                this.settled = true;
                Poll::Ready(value)
            }
            Poll::Ready(Err(_)) => {
                // The target went away with our listener still registered.
                // The event can no longer fire, so the wait stalls.
                tracing::warn!(event = %this.event, "event source dropped before the event fired");
                this.abandoned = true;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Once {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let Registration {
            target,
            shape,
            id,
            use_capture,
        } = &self.registration;
        if let Some(target) = target.upgrade() {
            tracing::trace!(event = %self.event, "dropping unresolved wait");
            shape.unsubscribe(target.as_ref(), &self.event, *id, *use_capture);
        }
    }
}

/// Wait for the next occurrence of `event` on `target`
///
/// The registration shape is chosen by [`Shape::probe`]. The listener removes
/// itself on its first invocation, so later firings are not observed.
/// Fails immediately if `target` exposes none of the three shapes.
pub fn once(target: Arc<dyn EventSource>, event: &str, options: OnceOptions) -> Result<Once> {
    let shape = Shape::probe(target.as_ref()).ok_or_else(|| Error::registration_mismatch(event))?;

    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let id = ListenerId::next();
    let weak = Arc::downgrade(&target);
    let event_name = event.to_string();
    let OnceOptions { use_capture, spread } = options;

    let listener = Listener::with_id(id, move |args: &[Value]| {
        let Some(tx) = tx.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            return;
        };
        if let Some(target) = weak.upgrade() {
            shape.unsubscribe(target.as_ref(), &event_name, id, use_capture);
        }
        let value = if spread {
            Value::Array(args.to_vec())
        } else {
            args.first().cloned().unwrap_or(Value::Null)
        };
        let _ = tx.send(value);
    });

    tracing::trace!(event, %shape, use_capture, "waiting for event");
    shape.subscribe(target.as_ref(), event, listener, use_capture);

    Ok(Once {
        event: event.to_string(),
        rx,
        abandoned: false,
        settled: false,
        registration: Registration {
            target: Arc::downgrade(&target),
            shape,
            id,
            use_capture,
        },
    })
}

/// Like [`once`], but resolves with every argument the event carried
pub fn once_spread(
    target: Arc<dyn EventSource>,
    event: &str,
    use_capture: bool,
) -> Result<impl Future<Output = Vec<Value>> + Send> {
    let once = once(
        target,
        event,
        OnceOptions {
            use_capture,
            spread: true,
        },
    )?;
    Ok(async move {
        match once.await {
            Value::Array(args) => args,
            other => vec![other],
        }
    })
}

/// Wait until every event has fired, returning their values in input order
pub async fn wait_for_all(waits: Vec<Once>) -> Vec<Value> {
    join_all(waits).await
}

/// Poll `predicate` every `interval` until it holds
///
/// Returns without sleeping when the predicate already holds. Always
/// resolves to `true`; there is no upper bound on the wait.
pub async fn wait_until<F>(mut predicate: F, interval: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let mut polls: u64 = 1;
    while !predicate() {
        tokio::time::sleep(interval).await;
        polls += 1;
    }
    tracing::trace!(polls, "wait_until satisfied");
    true
}

/// Suspend the calling task for `duration` without blocking other tasks
pub async fn idle_wait(duration: Duration) {
    tokio::time::sleep(duration).await;
}

/// Spin the calling thread for `duration` without yielding
///
/// Simulates main-thread saturation. Never call this on a runtime thread
/// that other pending work depends on.
pub fn busy_wait(duration: Duration) {
    let start = Instant::now();
    while start.elapsed() < duration {
        std::hint::spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::test_targets::{DomNode, HybridView, Inert, ObserverService};
    use crate::events::EventEmitter;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_once_resolves_with_first_argument() {
        let emitter = Arc::new(EventEmitter::new());
        let wait = once(emitter.clone(), "rendered", OnceOptions::default()).unwrap();
        assert_eq!(wait.event(), "rendered");

        emitter.emit("rendered", &[json!("overview"), json!(100)]);
        assert_eq!(wait.await, json!("overview"));
    }

    #[tokio::test]
    async fn test_once_without_arguments_resolves_null() {
        let emitter = Arc::new(EventEmitter::new());
        let wait = once(emitter.clone(), "stopped", OnceOptions::default()).unwrap();
        emitter.emit("stopped", &[]);
        assert_eq!(wait.await, Value::Null);
    }

    #[tokio::test]
    async fn test_once_spread_resolves_all_arguments() {
        let emitter = Arc::new(EventEmitter::new());
        let wait = once_spread(emitter.clone(), "rendered", false).unwrap();
        emitter.emit("rendered", &[json!("overview"), json!(100)]);
        assert_eq!(wait.await, vec![json!("overview"), json!(100)]);
    }

    #[tokio::test]
    async fn test_once_resolves_once_and_unsubscribes() {
        let emitter = Arc::new(EventEmitter::new());
        let wait = once(emitter.clone(), "tick", OnceOptions::default()).unwrap();
        assert_eq!(emitter.listener_count("tick"), 1);

        assert_eq!(emitter.emit("tick", &[json!(1)]), 1);
        assert_eq!(emitter.listener_count("tick"), 0);
        // Later firings reach nobody
        assert_eq!(emitter.emit("tick", &[json!(2)]), 0);
        assert_eq!(wait.await, json!(1));
    }

    #[tokio::test]
    async fn test_once_on_dom_target_uses_capture_flag() {
        let node = Arc::new(DomNode::default());
        let wait = once(
            node.clone(),
            "load",
            OnceOptions {
                use_capture: true,
                spread: false,
            },
        )
        .unwrap();
        assert_eq!(node.count("load", true), 1);

        node.dispatch("load", &[json!({"tab": 1})]);
        assert_eq!(node.count("load", true), 0);
        assert_eq!(wait.await, json!({"tab": 1}));
    }

    #[tokio::test]
    async fn test_once_on_listener_list() {
        let observers = Arc::new(ObserverService::default());
        let wait = once(observers.clone(), "connection-opened", OnceOptions::default()).unwrap();
        observers.notify("connection-opened", &[json!(true)]);
        observers.notify("connection-opened", &[json!(false)]);
        assert_eq!(observers.count("connection-opened"), 0);
        assert_eq!(wait.await, json!(true));
    }

    #[tokio::test]
    async fn test_once_prefers_emitter_shape() {
        let view = Arc::new(HybridView::default());
        let _wait = once(view.clone(), "rendered", OnceOptions::default()).unwrap();
        assert_eq!(view.emitter.listener_count("rendered"), 1);
        assert_eq!(view.node.count("rendered", false), 0);
    }

    #[test]
    fn test_once_on_inert_target_fails_fast() {
        let err = once(Arc::new(Inert), "rendered", OnceOptions::default())
            .err()
            .expect("registration should fail");
        assert!(matches!(err, Error::RegistrationMismatch { ref event } if event == "rendered"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_can_be_raced_against_a_deadline() {
        let emitter = Arc::new(EventEmitter::new());
        let wait = once(emitter.clone(), "never", OnceOptions::default()).unwrap();
        let raced = tokio::time::timeout(Duration::from_secs(5), wait).await;
        assert!(raced.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_wait_deregisters() {
        let emitter = Arc::new(EventEmitter::new());
        let wait = once(emitter.clone(), "never", OnceOptions::default()).unwrap();
        assert_eq!(emitter.listener_count("never"), 1);

        let raced = tokio::time::timeout(Duration::from_millis(10), wait).await;
        assert!(raced.is_err());
        assert_eq!(emitter.listener_count("never"), 0);
    }

    #[test]
    fn test_dropped_wait_deregisters_on_each_shape() {
        let node = Arc::new(DomNode::default());
        let capture = OnceOptions {
            use_capture: true,
            spread: false,
        };
        drop(once(node.clone(), "load", capture).unwrap());
        assert_eq!(node.count("load", true), 0);

        let observers = Arc::new(ObserverService::default());
        drop(once_spread(observers.clone(), "topic", false).unwrap());
        assert_eq!(observers.count("topic"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_stalls_when_target_dropped() {
        let emitter = Arc::new(EventEmitter::new());
        let wait = once(emitter.clone(), "rendered", OnceOptions::default()).unwrap();
        drop(emitter);
        let raced = tokio::time::timeout(Duration::from_secs(1), wait).await;
        assert!(raced.is_err());
    }

    #[tokio::test]
    async fn test_wait_for_all_keeps_input_order() {
        let emitter = Arc::new(EventEmitter::new());
        let waits = vec![
            once(emitter.clone(), "waterfall", OnceOptions::default()).unwrap(),
            once(emitter.clone(), "overview", OnceOptions::default()).unwrap(),
        ];
        emitter.emit("overview", &[json!("o")]);
        emitter.emit("waterfall", &[json!("w")]);
        assert_eq!(wait_for_all(waits).await, vec![json!("w"), json!("o")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_true_does_not_sleep() {
        let start = tokio::time::Instant::now();
        assert!(wait_until(|| true, Duration::from_secs(60)).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_resolves_on_third_poll() {
        let polls = AtomicUsize::new(0);
        let start = tokio::time::Instant::now();
        let done = wait_until(
            || polls.fetch_add(1, Ordering::SeqCst) + 1 > 2,
            DEFAULT_POLL_INTERVAL,
        )
        .await;
        assert!(done);
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        let elapsed = start.elapsed();
        assert!(elapsed >= DEFAULT_POLL_INTERVAL * 2);
        assert!(elapsed < DEFAULT_POLL_INTERVAL * 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_wait_lets_other_tasks_run() {
        let flag = Arc::new(AtomicUsize::new(0));
        let other = flag.clone();
        let task = tokio::spawn(async move {
            other.store(1, Ordering::SeqCst);
        });
        idle_wait(Duration::from_millis(50)).await;
        assert_eq!(flag.load(Ordering::SeqCst), 1);
        task.await.unwrap();
    }

    #[test]
    fn test_busy_wait_blocks_for_duration() {
        let start = Instant::now();
        busy_wait(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
