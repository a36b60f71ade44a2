use std::sync::atomic::{AtomicUsize, Ordering};

use crate::types::Split;

/// Observer of split progress. Every method defaults to doing nothing.
pub trait ProgressReporter: Send + Sync {
    fn split_started(&self, _split: Split, _total: usize) {}

    /// Called once per task result, success or failure.
    fn task_completed(&self, _split: Split) {}

    fn split_finished(&self, _split: Split, _failed: usize, _successful: usize) {}
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {}

/// Monotonic count of completed tasks across all splits.
#[derive(Debug, Default)]
pub struct CompletionCounter {
    completed: AtomicUsize,
}

impl CompletionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }
}

impl ProgressReporter for CompletionCounter {
    fn task_completed(&self, _split: Split) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}
