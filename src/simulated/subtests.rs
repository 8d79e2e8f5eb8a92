//! Built-in subtests against the simulated application

use std::sync::Arc;
use std::time::Duration;

use crate::common::Result;
use crate::recording::{start_recording, stop_recording, wait_for_widgets_rendered, RecordingOptions};
use crate::runner::{SubtestRegistry, Timer};
use crate::waiter::{busy_wait, idle_wait, wait_until, DEFAULT_POLL_INTERVAL};

use super::panel::{PanelTiming, SimulatedPanel};
use super::workload::SimulatedWorkload;

/// Names of the subtests [`register_builtin_subtests`] provides
pub const BUILTIN_SUBTESTS: [&str; 4] = ["busyWait", "idleWait", "profilerFetchData", "renderDetails"];

/// Knobs of the built-in subtests
#[derive(Debug, Clone)]
pub struct BuiltinSettings {
    pub panel: PanelTiming,
    /// Benchmark runs `profilerFetchData` waits for before stopping
    pub workload_runs: usize,
    pub workload_iteration: Duration,
    /// How often `profilerFetchData` checks the benchmark
    pub completion_poll: Duration,
    /// Duration `idleWait` sleeps for
    pub idle: Duration,
    /// Duration `busyWait` spins for
    pub busy: Duration,
}

impl Default for BuiltinSettings {
    fn default() -> Self {
        Self {
            panel: PanelTiming::default(),
            workload_runs: 1,
            workload_iteration: Duration::from_millis(50),
            completion_poll: DEFAULT_POLL_INTERVAL,
            idle: Duration::from_millis(100),
            busy: Duration::from_millis(20),
        }
    }
}

impl BuiltinSettings {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.completion_poll = interval;
        self
    }
}

/// Register every built-in subtest into `registry`
pub fn register_builtin_subtests(registry: &mut SubtestRegistry, settings: BuiltinSettings) {
    let settings = Arc::new(settings);

    let s = settings.clone();
    registry.register("profilerFetchData", move |timer: Timer| {
        profiler_fetch_data(timer, s.clone())
    });

    let s = settings.clone();
    registry.register("renderDetails", move |timer: Timer| render_details(timer, s.clone()));

    let idle = settings.idle;
    registry.register("idleWait", move |mut timer: Timer| async move {
        timer.start()?;
        idle_wait(idle).await;
        timer.stop()?;
        Ok(())
    });

    let busy = settings.busy;
    registry.register("busyWait", move |mut timer: Timer| async move {
        timer.start()?;
        busy_wait(busy);
        timer.stop()?;
        Ok(())
    });
}

/// Record while the benchmark runs, then time stopping the recording
async fn profiler_fetch_data(mut timer: Timer, settings: Arc<BuiltinSettings>) -> Result<()> {
    let panel = SimulatedPanel::new(settings.panel.clone());
    start_recording(&panel, RecordingOptions::default()).await?;

    let workload = SimulatedWorkload::new(settings.workload_iteration);
    let runs = settings.workload_runs;
    let _benchmark = workload.run(runs);
    wait_until(move || workload.is_completed(runs), settings.completion_poll).await;

    timer.start()?;
    stop_recording(&panel, RecordingOptions::default()).await?;
    timer.stop()?;
    Ok(())
}

/// Time stopping a recording until every widget has rendered
///
/// Besides the total, records the laps at which the recording had stopped
/// and at which all widgets were rendered.
async fn render_details(mut timer: Timer, settings: Arc<BuiltinSettings>) -> Result<()> {
    let panel = SimulatedPanel::new(settings.panel.clone());
    start_recording(&panel, RecordingOptions::default()).await?;

    let rendered = wait_for_widgets_rendered(&panel)?;
    timer.start()?;
    stop_recording(&panel, RecordingOptions::default()).await?;
    let stopped_at = timer.elapsed_ms().unwrap_or_default();
    rendered.await;
    let rendered_at = timer.elapsed_ms().unwrap_or_default();

    timer.record_series("laps", vec![stopped_at, rendered_at]);
    timer.stop()?;
    Ok(())
}
