//! metaperf - a performance test harness for recording UIs
//!
//! Subtests are registered by name, expanded into a queue of commands by
//! the [`TestRunner`], executed strictly one at a time, and timed with a
//! per-invocation [`Timer`]. Events from the UI under test are awaited
//! through [`waiter::once`], whatever listener shape the target exposes.

pub mod cli;
pub mod commands;
pub mod common;
pub mod events;
pub mod recording;
pub mod report;
pub mod runner;
pub mod simulated;
pub mod waiter;

pub use common::config::RunConfig;
pub use common::{Error, Result};
pub use events::{EventEmitter, EventSource};
pub use report::{ResultsReporter, TelemetrySink};
pub use runner::{
    HeadlessHost, Host, Measurement, MeasurementValue, SubtestRegistry, TestRunner, Timer,
};
