//! Host application seam
//!
//! The runner needs a handful of things from the application hosting the
//! UI under test: which tab/window context is in the foreground, a way to
//! move input focus into content, a way to bring a context back to the
//! foreground, and a profiler marker facility.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::common::Result;

/// Opaque identity of a foreground context (tab, window, view)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u64);

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "context-{}", self.0)
    }
}

/// The application hosting the UI under test
#[async_trait]
pub trait Host: Send + Sync {
    /// The currently selected foreground context
    ///
    /// Fails with [`crate::Error::MissingPrerequisite`] when there is no
    /// host window to run in.
    async fn foreground(&self) -> Result<ContextId>;

    /// Move input focus into content so caret blinking does not perturb timings
    async fn focus_content(&self) -> Result<()>;

    /// Bring `context` back to the foreground
    async fn select(&self, context: ContextId) -> Result<()>;

    /// Drop a named marker into the profiler timeline
    fn mark(&self, label: &str);
}

/// Call made against a [`HeadlessHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Foreground,
    FocusContent,
    Select(ContextId),
    Mark(String),
}

/// Host with a single context and no window system
///
/// Markers are emitted as tracing events. Every call is journaled so a run's
/// interaction with its host can be inspected afterwards.
#[derive(Debug)]
pub struct HeadlessHost {
    context: ContextId,
    journal: Mutex<Vec<HostCall>>,
}

impl Default for HeadlessHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self {
            context: ContextId(0),
            journal: Mutex::new(Vec::new()),
        }
    }

    fn log(&self, call: HostCall) {
        self.journal
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
    }

    /// Calls made so far, in order
    pub fn journal(&self) -> Vec<HostCall> {
        self.journal.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Host for HeadlessHost {
    async fn foreground(&self) -> Result<ContextId> {
        self.log(HostCall::Foreground);
        Ok(self.context)
    }

    async fn focus_content(&self) -> Result<()> {
        self.log(HostCall::FocusContent);
        Ok(())
    }

    async fn select(&self, context: ContextId) -> Result<()> {
        tracing::debug!(%context, "selecting context");
        self.log(HostCall::Select(context));
        Ok(())
    }

    fn mark(&self, label: &str) {
        tracing::info!(marker = label, "profiler marker");
        self.log(HostCall::Mark(label.to_string()));
    }
}
