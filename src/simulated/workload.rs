//! Background benchmark the profiler records while it runs

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// A benchmark that completes one run per `iteration`
#[derive(Debug, Clone)]
pub struct SimulatedWorkload {
    iteration: Duration,
    completed: Arc<AtomicUsize>,
}

impl SimulatedWorkload {
    pub fn new(iteration: Duration) -> Self {
        Self {
            iteration,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start `runs` runs in the background
    pub fn run(&self, runs: usize) -> JoinHandle<()> {
        let iteration = self.iteration;
        let completed = self.completed.clone();
        tokio::spawn(async move {
            for _ in 0..runs {
                tokio::time::sleep(iteration).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(done, "workload run completed");
            }
        })
    }

    /// Runs finished so far
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn is_completed(&self, runs: usize) -> bool {
        self.completed() >= runs
    }
}
