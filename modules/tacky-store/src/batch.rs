//! Batch scheduler state.
//!
//! Owns the reentrancy guard and the open/flushing/pending bookkeeping for one
//! store. All state lives in `Cell`s: the store is single-threaded, and the
//! guard exists to reject synchronous reentry, not to arbitrate threads.
//!
//! # Invariants
//!
//! 1. `is_updating` is true only while a mutation function executes, and is
//!    cleared on every exit path (including unwinding).
//! 2. At most one batch is open. Opening while one is open returns `None`.
//! 3. A flush runs only for the batch that is currently open and still
//!    flushing; any other invocation is stale and is absorbed.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BatchId(u64);

impl BatchId {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// What a flush hands to the history recorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchRecord {
    pub id: BatchId,
    /// Names of the actions folded into the batch, in dispatch order.
    pub actions: Vec<String>,
}

pub struct BatchScheduler {
    is_updating: Cell<bool>,
    is_in_batch: Cell<bool>,
    is_flushing: Cell<bool>,
    /// Batch whose deferred flush has not run yet.
    dirty_job: Cell<Option<BatchId>>,
    open: Cell<Option<BatchId>>,
    next_id: Cell<u64>,
    actions: RefCell<Vec<String>>,
}

impl BatchScheduler {
    pub fn new() -> Self {
        Self {
            is_updating: Cell::new(false),
            is_in_batch: Cell::new(false),
            is_flushing: Cell::new(true),
            dirty_job: Cell::new(None),
            open: Cell::new(None),
            next_id: Cell::new(1),
            actions: RefCell::new(Vec::new()),
        }
    }

    pub fn is_updating(&self) -> bool {
        self.is_updating.get()
    }

    pub fn is_in_batch(&self) -> bool {
        self.is_in_batch.get()
    }

    pub fn is_flushing(&self) -> bool {
        self.is_flushing.get()
    }

    pub fn has_pending_flush(&self) -> bool {
        self.dirty_job.get().is_some()
    }

    /// Mark a mutation as executing until the returned guard drops.
    pub fn begin_update(&self) -> UpdateGuard<'_> {
        self.is_updating.set(true);
        UpdateGuard { scheduler: self }
    }

    /// Attribute an executed action to the batch it lands in.
    pub fn note_action(&self, name: &str) {
        self.actions.borrow_mut().push(name.to_string());
    }

    /// Open a batch unless one is already open.
    pub fn open(&self) -> Option<BatchId> {
        if self.is_in_batch.get() {
            return None;
        }

        let id = BatchId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.is_in_batch.set(true);
        self.is_flushing.set(true);
        self.open.set(Some(id));
        Some(id)
    }

    /// Record `id` as the pending deferred flush.
    pub fn park(&self, id: BatchId) {
        self.dirty_job.set(Some(id));
    }

    /// Take the pending deferred flush, if any, so the caller can run it now.
    pub fn take_dirty(&self) -> Option<BatchId> {
        self.dirty_job.take()
    }

    /// Mark batch `id` as consumed. Later flushes referencing it no-op.
    ///
    /// Leaves a newer batch (opened by a listener during the flush) alone.
    pub fn consume(&self, id: BatchId) {
        if self.open.get().map_or(true, |open| open == id) {
            self.is_flushing.set(false);
        }
    }

    /// Whether actions ran since the last flush began. True after a flush
    /// when listeners dispatched while it was running.
    pub fn has_unflushed_actions(&self) -> bool {
        !self.actions.borrow().is_empty()
    }

    /// Start flushing `id`. Returns `None` for a stale invocation.
    ///
    /// The returned guard closes the batch when dropped, so a panicking
    /// listener cannot leave the store stuck in an open batch.
    pub fn begin_flush(&self, id: BatchId) -> Option<FlushGuard<'_>> {
        let eligible =
            self.is_flushing.get() && self.is_in_batch.get() && self.open.get() == Some(id);
        if !eligible {
            return None;
        }

        // Already running; an atom dispatched by a listener must not re-enter it.
        self.dirty_job.set(None);
        let actions = std::mem::take(&mut *self.actions.borrow_mut());
        Some(FlushGuard {
            scheduler: self,
            record: BatchRecord { id, actions },
        })
    }

    fn close(&self) {
        self.is_in_batch.set(false);
        self.dirty_job.set(None);
        self.open.set(None);
    }
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BatchScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchScheduler")
            .field("is_updating", &self.is_updating.get())
            .field("is_in_batch", &self.is_in_batch.get())
            .field("is_flushing", &self.is_flushing.get())
            .field("dirty_job", &self.dirty_job.get())
            .field("open", &self.open.get())
            .finish()
    }
}

pub struct UpdateGuard<'a> {
    scheduler: &'a BatchScheduler,
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.is_updating.set(false);
    }
}

pub struct FlushGuard<'a> {
    scheduler: &'a BatchScheduler,
    record: BatchRecord,
}

impl FlushGuard<'_> {
    pub fn record(&self) -> &BatchRecord {
        &self.record
    }
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.close();
    }
}

/// Keep only the first occurrence of each item, preserving relative order.
pub fn deduplicate<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicate_keeps_first_occurrence_order() {
        assert_eq!(deduplicate(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert!(deduplicate(Vec::<u8>::new()).is_empty());
    }

    #[test]
    fn update_guard_clears_flag_on_drop() {
        let scheduler = BatchScheduler::new();
        {
            let _guard = scheduler.begin_update();
            assert!(scheduler.is_updating());
        }
        assert!(!scheduler.is_updating());
    }

    #[test]
    fn update_guard_clears_flag_on_unwind() {
        let scheduler = BatchScheduler::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = scheduler.begin_update();
            panic!("mutation blew up");
        }));
        assert!(result.is_err());
        assert!(!scheduler.is_updating());
    }

    #[test]
    fn only_one_batch_opens_at_a_time() {
        let scheduler = BatchScheduler::new();
        let first = scheduler.open().expect("first batch opens");
        assert!(scheduler.open().is_none());

        drop(scheduler.begin_flush(first).expect("open batch flushes"));
        let second = scheduler.open().expect("batch reopens after flush");
        assert!(second > first);
    }

    #[test]
    fn consumed_batch_rejects_flush() {
        let scheduler = BatchScheduler::new();
        let id = scheduler.open().unwrap();
        scheduler.consume(id);
        assert!(scheduler.begin_flush(id).is_none());
    }

    #[test]
    fn flush_of_closed_batch_is_stale() {
        let scheduler = BatchScheduler::new();
        let old = scheduler.open().unwrap();
        scheduler.park(old);
        drop(scheduler.begin_flush(old).unwrap());

        assert!(!scheduler.has_pending_flush());
        assert!(scheduler.begin_flush(old).is_none());

        let new = scheduler.open().unwrap();
        assert!(scheduler.begin_flush(old).is_none());
        assert!(scheduler.begin_flush(new).is_some());
    }

    #[test]
    fn flush_takes_attributed_actions() {
        let scheduler = BatchScheduler::new();
        let id = scheduler.open().unwrap();
        scheduler.note_action("a");
        scheduler.note_action("b");

        let guard = scheduler.begin_flush(id).unwrap();
        assert_eq!(guard.record().actions, vec!["a".to_string(), "b".to_string()]);
        assert!(!scheduler.has_unflushed_actions());
        drop(guard);
        assert!(!scheduler.is_in_batch());
    }

    #[test]
    fn consume_ignores_newer_batch() {
        let scheduler = BatchScheduler::new();
        let old = scheduler.open().unwrap();
        drop(scheduler.begin_flush(old).unwrap());
        let newer = scheduler.open().unwrap();

        scheduler.consume(old);
        assert!(scheduler.is_flushing());
        assert!(scheduler.begin_flush(newer).is_some());
    }
}
