//! Logging and tracing configuration
//!
//! Diagnostics go to stderr so that stdout carries only the results line and
//! the measurement summary a downstream collector parses.

use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use super::paths;

/// File name of the harness log inside the log directory
const LOG_FILE_NAME: &str = "metaperf.log";

fn default_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives))
}

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli() {
    tracing_subscriber::registry()
        .with(default_filter("metaperf=info,warn"))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing to stderr plus a log file
///
/// The file receives full detail (debug level by default, with span
/// enter/exit) through a non-blocking writer. The returned guard must be held
/// until the process exits or buffered lines are lost.
pub fn init_with_file(dir: Option<&Path>) -> Option<(PathBuf, WorkerGuard)> {
    let dir = match dir {
        Some(dir) => {
            if let Err(e) = std::fs::create_dir_all(dir) {
                eprintln!("Warning: Could not create log directory: {}", e);
                init_cli();
                return None;
            }
            dir.to_path_buf()
        }
        None => match paths::ensure_log_dir() {
            Ok(Some(dir)) => dir,
            _ => {
                init_cli();
                return None;
            }
        },
    };

    let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::ENTER | FmtSpan::EXIT);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .compact();

    tracing_subscriber::registry()
        .with(default_filter("metaperf=debug,info"))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Some((dir.join(LOG_FILE_NAME), guard))
}
