//! Strictly sequential command queue
//!
//! Commands are futures; the sequencer awaits each one to completion before
//! advancing to the next, so two commands never overlap. When the queue is
//! exhausted the completion callback runs exactly once.

use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::common::Result;

/// One queued asynchronous step
pub type Command = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

type OnComplete = Box<dyn FnOnce() + Send>;

/// Box an async closure as a [`Command`]
pub fn command<F, Fut>(f: F) -> Command
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move || f().boxed())
}

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    /// No run loaded
    #[default]
    Idle,
    /// Commands are being executed
    Running,
    /// Queue exhausted, completion callback executing
    Draining,
}

impl std::fmt::Display for SequencerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
        }
    }
}

/// Outcome of [`Sequencer::advance`]
pub enum Advance {
    /// The next command, already started; await it before advancing again
    Next(BoxFuture<'static, Result<()>>),
    /// The queue is exhausted and the completion callback has run
    Complete,
}

/// Runs a queue of commands one at a time
#[derive(Default)]
pub struct Sequencer {
    state: SequencerState,
    commands: Vec<Option<Command>>,
    cursor: usize,
    on_complete: Option<OnComplete>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Index of the next command to execute
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of commands in the loaded queue
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Store a new queue and completion callback and enter `Running`
    ///
    /// Any run still in progress is abandoned: its queue, cursor and callback
    /// are overwritten.
    pub fn load<F>(&mut self, commands: Vec<Command>, on_complete: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.state == SequencerState::Running {
            tracing::warn!(
                abandoned_at = self.cursor,
                queued = self.commands.len(),
                "loading a new run over one still in progress"
            );
        }
        self.reset();
        self.commands = commands.into_iter().map(Some).collect();
        self.on_complete = Some(Box::new(on_complete));
        self.state = SequencerState::Running;
    }

    /// Start the command under the cursor, or finish the run
    ///
    /// The caller must drive the returned command to completion before
    /// calling `advance` again.
    pub fn advance(&mut self) -> Advance {
        if self.state != SequencerState::Running {
            tracing::debug!(state = %self.state, "advance outside a run");
            return Advance::Complete;
        }

        if self.cursor >= self.commands.len() {
            self.state = SequencerState::Draining;
            tracing::debug!(commands = self.commands.len(), "sequence complete");
            if let Some(on_complete) = self.on_complete.take() {
                on_complete();
            }
            self.reset();
            return Advance::Complete;
        }

        let index = self.cursor;
        self.cursor += 1;
        match self.commands[index].take() {
            Some(command) => {
                tracing::trace!(index, "starting command");
                Advance::Next(command())
            }
            // Unreachable while the cursor only moves forward
            None => self.advance(),
        }
    }

    /// Execute `commands` in order, then call `on_complete`
    ///
    /// A failing command aborts the run: remaining commands are dropped, the
    /// sequencer returns to `Idle`, `on_complete` is not called and the error
    /// is returned.
    pub async fn run<F>(&mut self, commands: Vec<Command>, on_complete: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.load(commands, on_complete);
        loop {
            match self.advance() {
                Advance::Complete => return Ok(()),
                Advance::Next(step) => {
                    if let Err(e) = step.await {
                        tracing::error!(index = self.cursor - 1, error = %e, "command failed, aborting sequence");
                        self.reset();
                        return Err(e);
                    }
                }
            }
        }
    }

    fn reset(&mut self) {
        self.commands.clear();
        self.cursor = 0;
        self.on_complete = None;
        self.state = SequencerState::Idle;
    }
}
