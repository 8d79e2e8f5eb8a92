//! Test runner
//!
//! Expands a [`RunConfig`] into one command per subtest invocation, drives
//! the commands through a [`Sequencer`], and reports the collected
//! measurements when the queue drains.

pub mod host;
pub mod registry;
pub mod results;
pub mod sequencer;
pub mod timer;

pub use host::{ContextId, HeadlessHost, Host, HostCall};
pub use registry::{symbol_for, SubtestFn, SubtestRegistry};
pub use results::{Measurement, MeasurementValue, Recorder, Results};
pub use sequencer::{command, Advance, Command, Sequencer, SequencerState};
pub use timer::{Timer, TimerFactory};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::common::config::RunConfig;
use crate::common::{Error, Result};
use crate::report::ResultsReporter;
use crate::waiter::idle_wait;

/// State of a single run
///
/// Created when a run starts and consumed when it ends; nothing outlives
/// the run except the results snapshot.
#[derive(Debug)]
pub struct RunContext {
    config: RunConfig,
    results: Results,
    timers: TimerFactory,
    started: Instant,
}

impl RunContext {
    pub fn new(config: RunConfig, prefix: &str) -> Self {
        let results = Results::new();
        let timers = TimerFactory::new(prefix, results.recorder());
        Self {
            config,
            results,
            timers,
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn results(&self) -> &Results {
        &self.results
    }

    /// Wall-clock time since the run started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// A fresh timer writing into this run's results
    pub fn create_timer(&self, label: &str) -> Timer {
        self.timers.create(label)
    }

    /// One command per subtest invocation
    ///
    /// Repeats of a subtest are contiguous and subtests keep their declared
    /// order: `[a, b]` with `repeat = 2` runs `a, a, b, b`.
    pub fn build_commands(&self, registry: &Arc<SubtestRegistry>) -> Vec<Command> {
        let mut commands = Vec::with_capacity(self.config.command_count());
        for name in &self.config.subtests {
            for iteration in 0..self.config.repeat {
                let registry = registry.clone();
                let name = name.clone();
                let timers = self.timers.clone();
                let rest = self.config.rest();
                commands.push(command(move || async move {
                    invoke_subtest(&registry, &name, iteration, &timers, rest).await
                }));
            }
        }
        commands
    }
}

async fn invoke_subtest(
    registry: &SubtestRegistry,
    name: &str,
    iteration: u32,
    timers: &TimerFactory,
    rest: Duration,
) -> Result<()> {
    if !rest.is_zero() {
        idle_wait(rest).await;
    }

    let subtest = registry.resolve(name)?;
    let timer = timers.create(name);

    tracing::debug!(subtest = name, iteration, "running subtest");
    subtest(timer)
        .await
        .map_err(|e| Error::subtest_failed(name, e))
}

/// Measurement name prefix used unless configured otherwise
pub const DEFAULT_PREFIX: &str = "metaperf";

/// Drives runs of registered subtests against a host application
pub struct TestRunner {
    registry: Arc<SubtestRegistry>,
    host: Arc<dyn Host>,
    reporter: ResultsReporter,
    custom_reporter: bool,
    prefix: String,
}

impl TestRunner {
    /// Runner with the default `metaperf` prefix, reporting to stdout
    pub fn new(registry: SubtestRegistry, host: Arc<dyn Host>) -> Self {
        let prefix = DEFAULT_PREFIX.to_string();
        Self {
            registry: Arc::new(registry),
            host,
            reporter: ResultsReporter::new(prefix.to_uppercase()),
            custom_reporter: false,
            prefix,
        }
    }

    /// Set the measurement name prefix
    ///
    /// Unless a reporter was supplied, the results tag follows the prefix,
    /// uppercased.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        if !self.custom_reporter {
            self.reporter = ResultsReporter::new(self.prefix.to_uppercase());
        }
        self
    }

    pub fn with_reporter(mut self, reporter: ResultsReporter) -> Self {
        self.reporter = reporter;
        self.custom_reporter = true;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Tag of the results line and of the start/end markers
    pub fn tag(&self) -> &str {
        self.reporter.tag()
    }

    pub fn registry(&self) -> &SubtestRegistry {
        &self.registry
    }

    /// Run `config` and hand a snapshot of the results to `on_done`
    ///
    /// Subtest failures are not caught: the first one aborts the run and is
    /// returned, and `on_done` is not called.
    pub async fn start_test<F>(&self, config: RunConfig, on_done: F) -> Result<()>
    where
        F: FnOnce(Vec<Measurement>) + Send,
    {
        let results = self.run(config).await?;
        on_done(results);
        Ok(())
    }

    /// Run `config` and return a snapshot of the results
    #[tracing::instrument(skip_all, fields(subtests = ?config.subtests, repeat = config.repeat))]
    pub async fn run(&self, config: RunConfig) -> Result<Vec<Measurement>> {
        config.validate()?;
        let context = RunContext::new(config, &self.prefix);
        let tag = self.reporter.tag().to_string();

        self.host.mark(&format!("{} - start", tag));
        let foreground = self.host.foreground().await?;
        self.host.focus_content().await?;

        tracing::info!(
            commands = context.config().command_count(),
            rest_ms = context.config().rest_ms,
            "starting run"
        );

        let commands = context.build_commands(&self.registry);
        let (frozen_tx, frozen_rx) = oneshot::channel();
        let on_drained = context.results().freeze_into(frozen_tx);

        let mut sequencer = Sequencer::new();
        if let Err(e) = sequencer.run(commands, on_drained).await {
            self.restore_foreground(foreground).await;
            return Err(e);
        }

        let snapshot = frozen_rx
            .await
            .unwrap_or_else(|_| context.results().snapshot());

        if let Err(e) = self.reporter.report(&snapshot) {
            self.restore_foreground(foreground).await;
            return Err(e);
        }
        self.host.select(foreground).await?;
        self.host.mark(&format!("{} - end", tag));

        tracing::info!(
            measurements = snapshot.len(),
            elapsed_ms = context.elapsed().as_millis() as u64,
            "run complete"
        );
        Ok(snapshot)
    }

    /// Best-effort foreground restore on the failure paths
    async fn restore_foreground(&self, foreground: ContextId) {
        if let Err(e) = self.host.select(foreground).await {
            tracing::warn!(error = %e, "could not restore foreground context");
        }
    }
}
