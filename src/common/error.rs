//! Error types for the metaperf harness
//!
//! Messages name the subtest, event or file involved so a failed run can be
//! diagnosed from the harness log alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Event Registration Errors ===
    #[error("Cannot wait for '{event}': target exposes no on/off, addEventListener/removeEventListener or addListener/removeListener pair")]
    RegistrationMismatch { event: String },

    // === Prerequisite Errors ===
    #[error("Missing prerequisite: {0}")]
    MissingPrerequisite(String),

    #[error("Timer '{0}' was stopped before it was started")]
    TimerNotStarted(String),

    #[error("Timer '{0}' was started twice")]
    TimerAlreadyStarted(String),

    // === Subtest Errors ===
    #[error("Subtest '{name}' not found (no function registered as '{symbol}')")]
    SubtestNotFound { name: String, symbol: String },

    #[error("Subtest '{name}' failed: {source}")]
    SubtestFailed {
        name: String,
        #[source]
        source: Box<Error>,
    },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a registration mismatch error for an event name
    pub fn registration_mismatch(event: &str) -> Self {
        Self::RegistrationMismatch {
            event: event.to_string(),
        }
    }

    /// Create a subtest not found error from the subtest name and the symbol searched
    pub fn subtest_not_found(name: &str, symbol: &str) -> Self {
        Self::SubtestNotFound {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }

    /// Wrap an error raised inside a subtest body
    pub fn subtest_failed(name: &str, source: Error) -> Self {
        Self::SubtestFailed {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    /// Whether this error came out of a subtest body rather than the harness
    pub fn is_subtest_failure(&self) -> bool {
        matches!(self, Self::SubtestFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtest_failure_keeps_source() {
        let err = Error::subtest_failed("scroll", Error::TimerNotStarted("scroll".into()));
        assert!(err.is_subtest_failure());
        assert_eq!(
            err.to_string(),
            "Subtest 'scroll' failed: Timer 'scroll' was stopped before it was started"
        );
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("Timer 'scroll' was stopped before it was started")
        );
    }

    #[test]
    fn test_registration_mismatch_names_event() {
        let err = Error::registration_mismatch("recording-started");
        assert!(err.to_string().contains("'recording-started'"));
        assert!(!err.is_subtest_failure());
    }
}
