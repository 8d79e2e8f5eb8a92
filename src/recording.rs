//! Recording choreography
//!
//! Starting or stopping a recording from the UI is a chain of lifecycle
//! events spread across the panel's controller, view and overview. Every
//! wait is registered before the action that triggers it, then awaited in
//! the order the panel emits them.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::common::Result;
use crate::events::{names, EventSource};
use crate::waiter::{once, once_spread, wait_for_all, Once, OnceOptions};

/// A recording UI under test
pub trait RecordingPanel: Send + Sync {
    /// Emits `recording-will-start`, `recording-started`, `recording-will-stop`, `recording-stopped`
    fn controller(&self) -> Arc<dyn EventSource>;

    /// Emits `ui-start-recording`, `ui-stop-recording`, `ui-state-changed`
    fn view(&self) -> Arc<dyn EventSource>;

    /// Emits `overview-rendered` with `[event name, resolution]` arguments
    fn overview(&self) -> Arc<dyn EventSource>;

    /// Every widget with the event it fires once rendered
    fn widgets(&self) -> Vec<(Arc<dyn EventSource>, &'static str)>;

    /// Toggle recording, as a click on the record button would
    fn click_record_button(&self);

    /// Resolution argument of the final, full-resolution overview render
    fn high_res_interval(&self) -> Value;
}

/// Which optional events the recording helpers wait for
#[derive(Debug, Clone, Copy)]
pub struct RecordingOptions {
    pub wait_for_overview: bool,
    pub wait_for_state_changed: bool,
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            wait_for_overview: true,
            wait_for_state_changed: true,
        }
    }
}

fn next(target: Arc<dyn EventSource>, event: &str) -> Result<Once> {
    once(target, event, OnceOptions::default())
}

/// Click record and wait until the recording is running
pub async fn start_recording(panel: &dyn RecordingPanel, options: RecordingOptions) -> Result<()> {
    let clicked = next(panel.view(), names::UI_START_RECORDING)?;
    let will_start = next(panel.controller(), names::RECORDING_WILL_START)?;
    let has_started = next(panel.controller(), names::RECORDING_STARTED)?;

    panel.click_record_button();
    clicked.await;
    will_start.await;

    let state_changed = if options.wait_for_state_changed {
        Some(next(panel.view(), names::UI_STATE_CHANGED)?)
    } else {
        None
    };

    has_started.await;

    let overview_rendered = if options.wait_for_overview {
        Some(next(panel.overview(), names::OVERVIEW_RENDERED)?)
    } else {
        None
    };

    if let Some(state_changed) = state_changed {
        state_changed.await;
    }
    if let Some(overview_rendered) = overview_rendered {
        overview_rendered.await;
    }
    tracing::debug!("recording started");
    Ok(())
}

/// Click record and wait until the recording is stopped and fully rendered
///
/// The overview renders several times at low resolution before the final
/// render at [`RecordingPanel::high_res_interval`]; only the latter ends the
/// wait. There is no bound on how many renders are skipped.
pub async fn stop_recording(panel: &dyn RecordingPanel, options: RecordingOptions) -> Result<()> {
    let clicked = next(panel.view(), names::UI_STOP_RECORDING)?;
    let will_stop = next(panel.controller(), names::RECORDING_WILL_STOP)?;
    let has_stopped = next(panel.controller(), names::RECORDING_STOPPED)?;

    panel.click_record_button();
    clicked.await;
    will_stop.await;

    let state_changed = if options.wait_for_state_changed {
        Some(next(panel.view(), names::UI_STATE_CHANGED)?)
    } else {
        None
    };

    has_stopped.await;

    if options.wait_for_overview {
        let high_res = panel.high_res_interval();
        let mut skipped = 0usize;
        loop {
            let args = once_spread(panel.overview(), names::OVERVIEW_RENDERED, false)?.await;
            if args.get(1) == Some(&high_res) {
                break;
            }
            skipped += 1;
        }
        tracing::debug!(skipped, "final overview rendered");
    }

    if let Some(state_changed) = state_changed {
        state_changed.await;
    }
    tracing::debug!("recording stopped");
    Ok(())
}

/// Register waits on every widget's rendered event
///
/// Registration happens immediately; the returned future resolves once all
/// widgets have rendered, with their event values in widget order.
pub fn wait_for_widgets_rendered(
    panel: &dyn RecordingPanel,
) -> Result<impl Future<Output = Vec<Value>> + Send> {
    let waits = panel
        .widgets()
        .into_iter()
        .map(|(target, event)| next(target, event))
        .collect::<Result<Vec<_>>>()?;
    Ok(wait_for_all(waits))
}
