//! Simulated recording panel
//!
//! Every view is an [`EventEmitter`]. Clicking the record button emits the UI
//! event synchronously and plays the rest of the lifecycle from a spawned
//! task, one `step` apart. Event arguments follow the emitter convention:
//! the event name first, then the payload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::runtime::Handle;
use tokio::time::sleep;

use crate::events::{names, EventEmitter, EventSource};
use crate::recording::RecordingPanel;

/// Overview resolution while a recording is still being processed
pub const LOW_RES_INTERVAL: u64 = 100;

/// Overview resolution of the final render
pub const HIGH_RES_INTERVAL: u64 = 16;

/// Pacing of the simulated lifecycle
#[derive(Debug, Clone)]
pub struct PanelTiming {
    /// Delay between consecutive lifecycle events
    pub step: Duration,
    /// Low-resolution overview renders emitted before the final one
    pub low_res_renders: usize,
}

impl Default for PanelTiming {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(5),
            low_res_renders: 3,
        }
    }
}

#[derive(Debug, Default)]
struct Views {
    controller: Arc<EventEmitter>,
    view: Arc<EventEmitter>,
    overview: Arc<EventEmitter>,
    waterfall: Arc<EventEmitter>,
    js_call_tree: Arc<EventEmitter>,
    js_flamegraph: Arc<EventEmitter>,
    memory_call_tree: Arc<EventEmitter>,
    memory_flamegraph: Arc<EventEmitter>,
}

impl Views {
    async fn play_start(self: Arc<Self>, timing: PanelTiming) {
        sleep(timing.step).await;
        emit(&self.controller, names::RECORDING_WILL_START, &[]);
        sleep(timing.step).await;
        emit(&self.controller, names::RECORDING_STARTED, &[]);
        sleep(timing.step).await;
        emit(&self.view, names::UI_STATE_CHANGED, &[json!("recording")]);
        sleep(timing.step).await;
        emit(&self.overview, names::OVERVIEW_RENDERED, &[json!(LOW_RES_INTERVAL)]);
    }

    async fn play_stop(self: Arc<Self>, timing: PanelTiming) {
        sleep(timing.step).await;
        emit(&self.controller, names::RECORDING_WILL_STOP, &[]);
        sleep(timing.step).await;
        emit(&self.controller, names::RECORDING_STOPPED, &[]);
        sleep(timing.step).await;
        emit(&self.view, names::UI_STATE_CHANGED, &[json!("recorded")]);

        for _ in 0..timing.low_res_renders {
            sleep(timing.step).await;
            emit(&self.overview, names::OVERVIEW_RENDERED, &[json!(LOW_RES_INTERVAL)]);
        }
        sleep(timing.step).await;
        emit(&self.overview, names::OVERVIEW_RENDERED, &[json!(HIGH_RES_INTERVAL)]);

        for graph in [
            names::MARKERS_GRAPH_RENDERED,
            names::MEMORY_GRAPH_RENDERED,
            names::FRAMERATE_GRAPH_RENDERED,
        ] {
            emit(&self.overview, graph, &[]);
        }

        sleep(timing.step).await;
        emit(&self.waterfall, names::WATERFALL_RENDERED, &[]);
        sleep(timing.step).await;
        emit(&self.js_call_tree, names::JS_CALL_TREE_RENDERED, &[]);
        sleep(timing.step).await;
        emit(&self.js_flamegraph, names::JS_FLAMEGRAPH_RENDERED, &[]);
        sleep(timing.step).await;
        emit(&self.memory_call_tree, names::MEMORY_CALL_TREE_RENDERED, &[]);
        sleep(timing.step).await;
        emit(&self.memory_flamegraph, names::MEMORY_FLAMEGRAPH_RENDERED, &[]);
    }
}

fn emit(emitter: &EventEmitter, event: &str, payload: &[Value]) {
    let mut args = Vec::with_capacity(payload.len() + 1);
    args.push(json!(event));
    args.extend_from_slice(payload);
    let delivered = emitter.emit(event, &args);
    tracing::trace!(event, delivered, "simulated event");
}

/// Recording panel backed by in-process emitters
#[derive(Debug)]
pub struct SimulatedPanel {
    views: Arc<Views>,
    timing: PanelTiming,
    recording: AtomicBool,
}

impl Default for SimulatedPanel {
    fn default() -> Self {
        Self::new(PanelTiming::default())
    }
}

impl SimulatedPanel {
    pub fn new(timing: PanelTiming) -> Self {
        Self {
            views: Arc::new(Views::default()),
            timing,
            recording: AtomicBool::new(false),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    pub fn timing(&self) -> &PanelTiming {
        &self.timing
    }
}

impl RecordingPanel for SimulatedPanel {
    fn controller(&self) -> Arc<dyn EventSource> {
        self.views.controller.clone()
    }

    fn view(&self) -> Arc<dyn EventSource> {
        self.views.view.clone()
    }

    fn overview(&self) -> Arc<dyn EventSource> {
        self.views.overview.clone()
    }

    fn widgets(&self) -> Vec<(Arc<dyn EventSource>, &'static str)> {
        fn source(emitter: &Arc<EventEmitter>) -> Arc<dyn EventSource> {
            emitter.clone()
        }

        let views = &self.views;
        vec![
            (source(&views.overview), names::MARKERS_GRAPH_RENDERED),
            (source(&views.overview), names::MEMORY_GRAPH_RENDERED),
            (source(&views.overview), names::FRAMERATE_GRAPH_RENDERED),
            (source(&views.overview), names::OVERVIEW_RENDERED),
            (source(&views.waterfall), names::WATERFALL_RENDERED),
            (source(&views.js_call_tree), names::JS_CALL_TREE_RENDERED),
            (source(&views.js_flamegraph), names::JS_FLAMEGRAPH_RENDERED),
            (source(&views.memory_call_tree), names::MEMORY_CALL_TREE_RENDERED),
            (source(&views.memory_flamegraph), names::MEMORY_FLAMEGRAPH_RENDERED),
        ]
    }

    fn click_record_button(&self) {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("record button clicked outside a tokio runtime, ignoring");
            return;
        };

        let starting = !self.recording.fetch_xor(true, Ordering::SeqCst);
        let views = self.views.clone();
        let timing = self.timing.clone();
        if starting {
            emit(&views.view, names::UI_START_RECORDING, &[]);
            handle.spawn(views.play_start(timing));
        } else {
            emit(&views.view, names::UI_STOP_RECORDING, &[]);
            handle.spawn(views.play_stop(timing));
        }
    }

    fn high_res_interval(&self) -> Value {
        json!(HIGH_RES_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waiter::{once, once_spread, OnceOptions};

    #[tokio::test(start_paused = true)]
    async fn test_click_toggles_recording() {
        let panel = SimulatedPanel::default();
        let started = once(panel.controller(), names::RECORDING_STARTED, OnceOptions::default()).unwrap();

        panel.click_record_button();
        assert!(panel.is_recording());
        assert_eq!(started.await, json!(names::RECORDING_STARTED));

        panel.click_record_button();
        assert!(!panel.is_recording());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overview_renders_carry_resolution() {
        let panel = SimulatedPanel::new(PanelTiming {
            step: Duration::from_millis(1),
            low_res_renders: 0,
        });
        let started = once_spread(panel.overview(), names::OVERVIEW_RENDERED, false).unwrap();
        panel.click_record_button();
        assert_eq!(
            started.await,
            vec![json!(names::OVERVIEW_RENDERED), json!(LOW_RES_INTERVAL)]
        );

        let stopped = once_spread(panel.overview(), names::OVERVIEW_RENDERED, false).unwrap();
        panel.click_record_button();
        assert_eq!(stopped.await[1], panel.high_res_interval());
    }

    #[test]
    fn test_click_without_runtime_is_ignored() {
        let panel = SimulatedPanel::default();
        panel.click_record_button();
        assert!(!panel.is_recording());
    }
}
