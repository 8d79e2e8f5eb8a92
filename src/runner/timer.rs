//! Per-subtest stopwatch
//!
//! A fresh [`Timer`] is handed to every subtest invocation. It is started
//! once and consumed by [`Timer::stop`], so it cannot be reused.

use tokio::time::Instant;

use crate::common::{Error, Result};

use super::results::{Measurement, Recorder};

/// Named stopwatch bound to a run's results
#[derive(Debug)]
pub struct Timer {
    label: String,
    name: String,
    started: Option<Instant>,
    recorder: Recorder,
}

impl Timer {
    pub(crate) fn new(prefix: &str, label: &str, recorder: Recorder) -> Self {
        Self {
            label: label.to_string(),
            name: format!("{}-{}", prefix, label),
            started: None,
            recorder,
        }
    }

    /// Subtest name the timer was created for
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Measurement name, `<prefix>-<label>`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&mut self) -> Result<()> {
        if self.started.is_some() {
            return Err(Error::TimerAlreadyStarted(self.name.clone()));
        }
        self.started = Some(Instant::now());
        Ok(())
    }

    /// Milliseconds since `start`, without stopping
    pub fn elapsed_ms(&self) -> Option<f64> {
        self.started.map(|t| t.elapsed().as_secs_f64() * 1000.0)
    }

    /// Record the milliseconds elapsed since `start` and return them
    pub fn stop(self) -> Result<f64> {
        let elapsed = self
            .elapsed_ms()
            .ok_or_else(|| Error::TimerNotStarted(self.name.clone()))?;
        self.recorder.record(Measurement::scalar(self.name, elapsed));
        Ok(elapsed)
    }

    /// Record an array-valued measurement named `<prefix>-<label>-<suffix>`
    ///
    /// Series are kept in the results and the completion snapshot but are
    /// left out of the telemetry report.
    pub fn record_series(&self, suffix: &str, values: Vec<f64>) {
        self.recorder
            .record(Measurement::series(format!("{}-{}", self.name, suffix), values));
    }
}

/// Hands out timers bound to one run's prefix and results
#[derive(Debug, Clone)]
pub struct TimerFactory {
    prefix: String,
    recorder: Recorder,
}

impl TimerFactory {
    pub(crate) fn new(prefix: &str, recorder: Recorder) -> Self {
        Self {
            prefix: prefix.to_string(),
            recorder,
        }
    }

    /// A fresh, unstarted timer for subtest `label`
    pub fn create(&self, label: &str) -> Timer {
        Timer::new(&self.prefix, label, self.recorder.clone())
    }
}
