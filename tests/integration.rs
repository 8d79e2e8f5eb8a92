//! End-to-end tests for the metaperf harness
//!
//! These drive the public API the way an embedding test suite would, and the
//! binary the way automation does: run, then parse the tagged results line.

use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use metaperf::recording::{start_recording, stop_recording, RecordingOptions};
use metaperf::runner::HostCall;
use metaperf::simulated::{register_builtin_subtests, BuiltinSettings, PanelTiming, SimulatedPanel};
use metaperf::waiter::{idle_wait, once, OnceOptions};
use metaperf::{
    EventEmitter, HeadlessHost, Measurement, MeasurementValue, ResultsReporter, RunConfig,
    SubtestRegistry, TelemetrySink, TestRunner, Timer,
};

/// Writer whose contents stay readable after being handed to the reporter
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct Telemetry(Mutex<Vec<String>>);

impl TelemetrySink for Telemetry {
    fn record_time(&self, _values: &str, names: &str) {
        self.0.lock().unwrap().push(names.to_string());
    }
}

/// Parse the `<TAG>_RESULTS_JSON=` line out of reporter output
fn parse_results(output: &str, tag: &str) -> Vec<Measurement> {
    let prefix = format!("{}_RESULTS_JSON=", tag);
    let line = output
        .lines()
        .find_map(|l| l.strip_prefix(&prefix))
        .unwrap_or_else(|| panic!("no results line in:\n{}", output));
    serde_json::from_str(line).unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_custom_subtests_end_to_end() {
    let mut registry = SubtestRegistry::new();
    let emitter = Arc::new(EventEmitter::new());

    let source = emitter.clone();
    registry.register("paint", move |mut timer: Timer| {
        let source = source.clone();
        async move {
            let painted = once(source.clone(), "paint", OnceOptions::default())?;
            timer.start()?;
            let emit_from = source.clone();
            tokio::spawn(async move {
                idle_wait(Duration::from_millis(20)).await;
                emit_from.emit("paint", &[serde_json::json!(1)]);
            });
            painted.await;
            timer.stop()?;
            Ok(())
        }
    });
    registry.register("layout", |mut timer: Timer| async move {
        timer.start()?;
        idle_wait(Duration::from_millis(5)).await;
        timer.stop()?;
        Ok(())
    });

    let output = Captured::default();
    let telemetry = Arc::new(Telemetry::default());
    let host = Arc::new(HeadlessHost::new());
    let runner = TestRunner::new(registry, host.clone())
        .with_prefix("damp")
        .with_reporter(
            ResultsReporter::new("DAMP")
                .with_writer(output.clone())
                .with_telemetry(telemetry.clone()),
        );

    let results = runner
        .run(RunConfig::new(["paint", "layout"], 2, 10))
        .await
        .unwrap();

    let names: Vec<_> = results.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["damp-paint", "damp-paint", "damp-layout", "damp-layout"]);
    assert!(results[0].value.as_scalar().unwrap() >= 20.0);

    assert_eq!(parse_results(&output.text(), "DAMP"), results);
    assert_eq!(
        *telemetry.0.lock().unwrap(),
        ["damp-paint,damp-paint,damp-layout,damp-layout"]
    );
    assert_eq!(emitter.listener_count("paint"), 0);

    let journal = host.journal();
    assert_eq!(journal.first(), Some(&HostCall::Mark("DAMP - start".to_string())));
    assert_eq!(journal.last(), Some(&HostCall::Mark("DAMP - end".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_builtin_subtests_end_to_end() {
    let mut registry = SubtestRegistry::new();
    register_builtin_subtests(&mut registry, BuiltinSettings::default());

    let output = Captured::default();
    let runner = TestRunner::new(registry, Arc::new(HeadlessHost::new()))
        .with_reporter(ResultsReporter::new("METAPERF").with_writer(output.clone()));

    let results = runner
        .run(RunConfig::new(["profilerFetchData", "renderDetails"], 1, 0))
        .await
        .unwrap();

    let series: Vec<_> = results.iter().filter(|m| m.value.is_series()).collect();
    assert_eq!(series.len(), 1);
    assert!(output.text().contains("metaperf-renderDetails-laps: "));
    assert!(matches!(
        results.last().map(|m| &m.value),
        Some(MeasurementValue::Scalar(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_recording_round_trip_on_simulated_panel() {
    let panel = SimulatedPanel::new(PanelTiming {
        step: Duration::from_millis(2),
        low_res_renders: 5,
    });
    let options = RecordingOptions::default();

    start_recording(&panel, options).await.unwrap();
    assert!(panel.is_recording());
    stop_recording(&panel, options).await.unwrap();
    assert!(!panel.is_recording());

    // A second round trip on the same panel works the same way
    start_recording(&panel, options).await.unwrap();
    stop_recording(&panel, options).await.unwrap();
    assert!(!panel.is_recording());
}

fn metaperf_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_metaperf"))
}

#[test]
fn test_cli_list() {
    let config_home = tempfile::tempdir().unwrap();
    let output = Command::new(metaperf_bin())
        .arg("list")
        .env("XDG_CONFIG_HOME", config_home.path())
        .output()
        .expect("Failed to run metaperf");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["busyWait", "idleWait", "profilerFetchData", "renderDetails"] {
        assert!(stdout.contains(name), "missing {} in:\n{}", name, stdout);
    }
}

#[test]
fn test_cli_run_prints_results_line() {
    let config_home = tempfile::tempdir().unwrap();
    let output = Command::new(metaperf_bin())
        .args(["run", "--subtest", "idleWait", "--repeat", "2", "--rest", "0"])
        .env("XDG_CONFIG_HOME", config_home.path())
        .output()
        .expect("Failed to run metaperf");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );

    let results = parse_results(&stdout, "METAPERF");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|m| m.name == "metaperf-idleWait"));
    assert!(results.iter().all(|m| m.value.as_scalar().unwrap() >= 100.0));
}

#[test]
fn test_cli_run_unknown_subtest_fails() {
    let config_home = tempfile::tempdir().unwrap();
    let output = Command::new(metaperf_bin())
        .args(["run", "--subtest", "nope", "--rest", "0"])
        .env("XDG_CONFIG_HOME", config_home.path())
        .output()
        .expect("Failed to run metaperf");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error:"), "stderr: {}", stderr);
    assert!(stderr.contains("test_nope"), "stderr: {}", stderr);
}
