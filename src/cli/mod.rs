//! CLI command handling
//!
//! Builds a run from the config file, an optional scenario file and the
//! command line, then drives it against the simulated application. The
//! results line goes to stdout; progress goes to stderr.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use crate::commands::Commands;
use crate::common::config::{Config, RunConfig};
use crate::common::{Error, Result};
use crate::report::ResultsReporter;
use crate::runner::{HeadlessHost, MeasurementValue, SubtestRegistry, TestRunner};
use crate::simulated::{register_builtin_subtests, BuiltinSettings};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            subtests,
            repeat,
            rest,
            scenario,
            config,
        } => {
            let config = load_config(config.as_deref())?;
            let run = resolve_run(&config, subtests, repeat, rest, scenario.as_deref())?;
            if run.subtests.is_empty() {
                return Err(Error::Config(
                    "no subtests given; pass --subtest or set [run] subtests in the config file"
                        .to_string(),
                ));
            }
            run_subtests(&config, run).await
        }

        Commands::List => {
            let registry = builtin_registry(&Config::default());
            println!("{}", "Built-in subtests:".cyan());
            for name in registry.names() {
                println!("  {}", name);
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

/// Run description for this invocation
///
/// A scenario file replaces the config file's `[run]` section, explicit
/// subtests replace the scenario's, and `--repeat` / `--rest` override
/// whichever was chosen.
pub fn resolve_run(
    config: &Config,
    subtests: Vec<String>,
    repeat: Option<u32>,
    rest: Option<u64>,
    scenario: Option<&Path>,
) -> Result<RunConfig> {
    let mut run = match scenario {
        Some(path) => RunConfig::from_yaml_file(path)?,
        None => config.run.clone(),
    };
    if !subtests.is_empty() {
        run.subtests = subtests;
    }
    if let Some(repeat) = repeat {
        run.repeat = repeat;
    }
    if let Some(rest) = rest {
        run.rest_ms = rest;
    }
    run.validate()?;
    Ok(run)
}

fn builtin_registry(config: &Config) -> SubtestRegistry {
    let mut registry = SubtestRegistry::new();
    register_builtin_subtests(
        &mut registry,
        BuiltinSettings::default().with_poll_interval(config.harness.poll_interval()),
    );
    registry
}

async fn run_subtests(config: &Config, run: RunConfig) -> Result<()> {
    let registry = builtin_registry(config);
    let reporter = ResultsReporter::new(config.harness.tag())
        .with_results_log(config.harness.results_log.clone());
    let runner = TestRunner::new(registry, Arc::new(HeadlessHost::new()))
        .with_prefix(config.harness.prefix.clone())
        .with_reporter(reporter);

    eprintln!(
        "{} {} ({} commands, rest {}ms)",
        "Running".cyan(),
        run.subtests.join(", ").bold(),
        run.command_count(),
        run.rest_ms
    );

    let results = match runner.run(run).await {
        Ok(results) => results,
        Err(e) => {
            eprintln!("  {} {}", "✗".red(), e);
            return Err(e);
        }
    };

    for m in &results {
        let shown = match &m.value {
            MeasurementValue::Scalar(v) => format!("{:.1}ms", v),
            MeasurementValue::Series(vs) => format!("{} laps", vs.len()),
        };
        eprintln!("  {} {} {}", "✓".green(), m.name, shown.dimmed());
    }
    eprintln!(
        "{} {} measurements",
        "✓".green().bold(),
        results.len().to_string().green().bold()
    );
    Ok(())
}
