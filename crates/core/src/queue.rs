use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// FIFO shared by all workers of a pool. Each item is claimed by exactly one worker.
pub struct TaskQueue<T> {
    inner: Arc<Mutex<VecDeque<T>>>,
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> TaskQueue<T> {
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(items.into_iter().collect())),
        }
    }

    /// Claim the next unclaimed item.
    pub fn pop(&self) -> Option<T> {
        self.inner.lock().expect("TaskQueue poisoned").pop_front()
    }

    /// Drop every unclaimed item.
    pub fn clear(&self) {
        self.inner.lock().expect("TaskQueue poisoned").clear();
    }
}
