//! Results reporting
//!
//! At the end of a run the measurements are written as one machine-readable
//! line (`<TAG>_RESULTS_JSON=[...]`), followed by a blank line and a
//! `name: value` summary, to stdout and optionally a results log file. Scalar
//! measurements are also forwarded to a telemetry sink when one is set.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::common::Result;
use crate::runner::{Measurement, MeasurementValue};

/// External recorder of scalar timings
pub trait TelemetrySink: Send + Sync {
    /// `values` and `names` are comma-joined, in results order
    fn record_time(&self, values: &str, names: &str);
}

/// Comma-joined scalar values and names, as handed to a [`TelemetrySink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryPayload {
    pub values: String,
    pub names: String,
}

/// Formats and delivers a run's measurements
pub struct ResultsReporter {
    tag: String,
    out: Mutex<Box<dyn Write + Send>>,
    results_log: Option<PathBuf>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
}

impl ResultsReporter {
    /// Reporter writing to stdout under `tag`, e.g. `METAPERF`
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            out: Mutex::new(Box::new(io::stdout())),
            results_log: None,
            telemetry: None,
        }
    }

    /// Replace stdout with another log sink
    pub fn with_writer<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.out = Mutex::new(Box::new(writer));
        self
    }

    /// Also append everything written to this file
    pub fn with_results_log(mut self, path: Option<PathBuf>) -> Self {
        self.results_log = path;
        self
    }

    pub fn with_telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The tagged results JSON line, without trailing newline
    pub fn results_line(&self, results: &[Measurement]) -> Result<String> {
        Ok(format!(
            "{}_RESULTS_JSON={}",
            self.tag,
            serde_json::to_string(results)?
        ))
    }

    /// One `name: value` line per measurement
    pub fn summary(results: &[Measurement]) -> String {
        results
            .iter()
            .map(|m| {
                let disp: Vec<String> = m.value.values().iter().map(|v| format_value(*v)).collect();
                format!("{}: {}\n", m.name, disp.join(" "))
            })
            .collect()
    }

    /// Scalar measurements for the telemetry sink; `None` if there are none
    pub fn telemetry_payload(results: &[Measurement]) -> Option<TelemetryPayload> {
        let (values, names): (Vec<String>, Vec<&str>) = results
            .iter()
            .filter_map(|m| match m.value {
                MeasurementValue::Scalar(v) => Some((v.to_string(), m.name.as_str())),
                MeasurementValue::Series(_) => None,
            })
            .unzip();

        if names.is_empty() {
            return None;
        }
        Some(TelemetryPayload {
            values: values.join(","),
            names: names.join(","),
        })
    }

    /// Write the results line and summary, then notify telemetry
    pub fn report(&self, results: &[Measurement]) -> Result<()> {
        let line = self.results_line(results)?;
        self.log(&format!("{}\n", line))?;
        self.log(&format!("\n{}", Self::summary(results)))?;

        tracing::info!(measurements = results.len(), tag = %self.tag, "results reported");

        if let Some(sink) = &self.telemetry {
            if let Some(payload) = Self::telemetry_payload(results) {
                tracing::debug!(names = %payload.names, "forwarding to telemetry");
                sink.record_time(&payload.values, &payload.names);
            }
        }
        Ok(())
    }

    fn log(&self, text: &str) -> Result<()> {
        {
            let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }

        if let Some(path) = &self.results_log {
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(text.as_bytes())?;
        }
        Ok(())
    }
}

/// One decimal place; NaN renders as `-1`
fn format_value(value: f64) -> String {
    if value.is_nan() {
        "-1".to_string()
    } else {
        format!("{:.1}", value)
    }
}
