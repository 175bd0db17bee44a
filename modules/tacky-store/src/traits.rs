//! Collaborator traits for the dispatch engine.
//!
//! The store owns none of these concerns itself. State storage, dependency
//! accumulation, history capture, next-tick deferral, and the host's batched
//! UI update pass are injected through [`StoreDeps`](crate::StoreDeps).

use serde_json::Value;
use tacky_history::HistoryError;

use crate::batch::BatchRecord;
use crate::observer::ObserverId;

/// The state tree the mutations operate on.
pub trait StateTree {
    /// Plain-value copy of one namespace, or of the whole tree for `None`.
    /// Returns `None` for an unknown namespace.
    fn snapshot(&self, namespace: Option<&str>) -> Option<Value>;

    /// Replace the whole tree with a snapshot previously returned by
    /// `snapshot(None)`, reporting affected observers as a write would.
    fn restore(&self, snapshot: &Value) -> anyhow::Result<()>;
}

/// Accumulates the observers affected by mutations since the last drain.
///
/// Populated by the state tree while a mutation runs; drained once per flush.
pub trait DependencyTracker {
    fn track(&self, observer: ObserverId);

    /// Take everything accumulated so far, in insertion order, repeats included.
    fn drain(&self) -> Vec<ObserverId>;
}

/// Receives one call per completed batch.
pub trait HistoryRecorder {
    /// Capture the current state as a new timeline entry. Only called while
    /// time travel is active.
    fn save(&self, batch: &BatchRecord);

    /// Mark the end of the current recording window. Called for every flush.
    fn end_batch(&self);

    /// Move the timeline cursor and return the state it lands on.
    fn travel(&self, _delta: isize) -> Result<Value, HistoryError> {
        Err(HistoryError::Unsupported)
    }
}

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Next-tick deferral: runs a task once, after all synchronously queued work.
pub trait Scheduler {
    fn schedule(&self, task: Task);
}

/// The host rendering environment's batched-update primitive.
pub trait RenderHost {
    /// Invoke `run`, applying every UI update it causes as one combined pass.
    fn batched_updates(&self, run: &mut dyn FnMut());
}
