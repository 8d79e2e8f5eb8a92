//! Measurements and the per-run results collection

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Value of a measurement: a single duration or a series of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Scalar(f64),
    Series(Vec<f64>),
}

impl MeasurementValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Series(_) => None,
        }
    }

    pub fn is_series(&self) -> bool {
        matches!(self, Self::Series(_))
    }

    /// Every number in the value, a scalar being a one-element list
    pub fn values(&self) -> &[f64] {
        match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::Series(vs) => vs,
        }
    }
}

/// A named result appended during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub name: String,
    pub value: MeasurementValue,
}

impl Measurement {
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: MeasurementValue::Scalar(value),
        }
    }

    pub fn series(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            value: MeasurementValue::Series(values),
        }
    }
}

type Shared = Arc<Mutex<Vec<Measurement>>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Vec<Measurement>> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

/// Ordered, append-only results of one run
///
/// Owned by the run's context. Timers receive a [`Recorder`], which can
/// append but never read or clear.
#[derive(Debug, Default)]
pub struct Results {
    inner: Shared,
}

impl Results {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write-only handle for timers
    pub fn recorder(&self) -> Recorder {
        Recorder {
            inner: self.inner.clone(),
        }
    }

    /// Owned copy of the measurements recorded so far
    pub fn snapshot(&self) -> Vec<Measurement> {
        lock(&self.inner).clone()
    }

    /// Completion callback that sends a snapshot through `tx` when invoked
    pub(crate) fn freeze_into(
        &self,
        tx: oneshot::Sender<Vec<Measurement>>,
    ) -> impl FnOnce() + Send + 'static {
        let inner = self.inner.clone();
        move || {
            let _ = tx.send(lock(&inner).clone());
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only handle onto a run's [`Results`]
#[derive(Debug, Clone)]
pub struct Recorder {
    inner: Shared,
}

impl Recorder {
    pub fn record(&self, measurement: Measurement) {
        tracing::debug!(name = %measurement.name, value = ?measurement.value, "measurement recorded");
        lock(&self.inner).push(measurement);
    }
}
