//! Host-environment implementations of [`Scheduler`] and [`RenderHost`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use tracing::trace;

use crate::traits::{RenderHost, Scheduler, Task};

// ---------------------------------------------------------------------------
// TaskQueue (manual drain, for tests and embedders with their own loop)
// ---------------------------------------------------------------------------

/// FIFO of deferred tasks, run only when the owner drains it.
#[derive(Default)]
pub struct TaskQueue {
    tasks: RefCell<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run queued tasks, including ones they enqueue, until none remain.
    /// Returns how many ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            // Release the borrow before running: tasks may schedule more work.
            let next = self.tasks.borrow_mut().pop_front();
            match next {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }
        if ran > 0 {
            trace!(ran, "task queue drained");
        }
        ran
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue").field("len", &self.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// LocalSpawner (tokio LocalSet)
// ---------------------------------------------------------------------------

/// Defers tasks onto the current `tokio::task::LocalSet`.
///
/// Must be used from within a `LocalSet` context; the store's state is
/// single-threaded and never crosses to another worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalSpawner;

impl Scheduler for LocalSpawner {
    fn schedule(&self, task: Task) {
        tokio::task::spawn_local(async move { task() });
    }
}

// ---------------------------------------------------------------------------
// DirectHost
// ---------------------------------------------------------------------------

/// Host without its own batching: runs the pass inline.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectHost;

impl RenderHost for DirectHost {
    fn batched_updates(&self, run: &mut dyn FnMut()) {
        run();
    }
}
