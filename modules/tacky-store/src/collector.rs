//! HistoryCollector: in-memory dependency tracker and history recorder.
//!
//! One object plays both collaborator roles: it accumulates the observers
//! reported by the state tree during a batch, and on `save` captures the
//! attached tree into a [`Timeline`].

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tacky_history::{HistoryError, Timeline};
use tracing::{debug, warn};

use crate::batch::BatchRecord;
use crate::observer::ObserverId;
use crate::traits::{DependencyTracker, HistoryRecorder, StateTree};
use crate::tree::MemoryStateTree;

pub struct HistoryCollector {
    pending: RefCell<Vec<ObserverId>>,
    timeline: RefCell<Timeline>,
    tree: RefCell<Option<Weak<dyn StateTree>>>,
    closed_batches: Cell<u64>,
}

impl HistoryCollector {
    pub fn new(history_limit: usize) -> Self {
        Self {
            pending: RefCell::new(Vec::new()),
            timeline: RefCell::new(Timeline::new(history_limit)),
            tree: RefCell::new(None),
            closed_batches: Cell::new(0),
        }
    }

    /// A collector wired to a fresh [`MemoryStateTree`] that reports into it.
    pub fn with_memory_tree(history_limit: usize) -> (Rc<Self>, Rc<MemoryStateTree>) {
        let collector = Rc::new(Self::new(history_limit));
        let tree = Rc::new(MemoryStateTree::new(collector.clone()));
        let weak = Rc::downgrade(&tree);
        collector.attach(weak);
        (collector, tree)
    }

    /// Set the tree captured on `save`. Held weakly: the tree usually holds
    /// this collector as its tracker.
    pub fn attach(&self, tree: Weak<dyn StateTree>) {
        *self.tree.borrow_mut() = Some(tree);
    }

    pub fn timeline(&self) -> Ref<'_, Timeline> {
        self.timeline.borrow()
    }

    /// Observers tracked since the last drain, repeats included.
    pub fn pending(&self) -> Vec<ObserverId> {
        self.pending.borrow().clone()
    }

    /// Recording windows closed so far (one per flush).
    pub fn closed_batches(&self) -> u64 {
        self.closed_batches.get()
    }

    fn capture(&self) -> Option<Value> {
        let tree = self.tree.borrow().as_ref().and_then(Weak::upgrade)?;
        tree.snapshot(None)
    }
}

impl DependencyTracker for HistoryCollector {
    fn track(&self, observer: ObserverId) {
        self.pending.borrow_mut().push(observer);
    }

    fn drain(&self) -> Vec<ObserverId> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

impl HistoryRecorder for HistoryCollector {
    fn save(&self, batch: &BatchRecord) {
        let Some(state) = self.capture() else {
            warn!(batch = %batch.id, "no state tree attached, snapshot dropped");
            return;
        };

        let mut timeline = self.timeline.borrow_mut();
        if let Some(snapshot) = timeline.record(state, Some(batch.id.get()), batch.actions.clone()) {
            debug!(
                batch = %batch.id,
                seq = snapshot.seq,
                actions = snapshot.actions.len(),
                "snapshot recorded"
            );
        }
    }

    fn end_batch(&self) {
        self.closed_batches.set(self.closed_batches.get() + 1);
    }

    fn travel(&self, delta: isize) -> Result<Value, HistoryError> {
        let mut timeline = self.timeline.borrow_mut();
        let snapshot = timeline.travel(delta)?;
        debug!(delta, seq = snapshot.seq, "timeline cursor moved");
        Ok(snapshot.state.clone())
    }
}

impl fmt::Debug for HistoryCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryCollector")
            .field("pending", &self.pending.borrow().len())
            .field("snapshots", &self.timeline.borrow().len())
            .field("closed_batches", &self.closed_batches.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchScheduler;
    use serde_json::json;

    fn record(scheduler: &BatchScheduler, action: &str) -> BatchRecord {
        let id = scheduler.open().unwrap();
        scheduler.note_action(action);
        let guard = scheduler.begin_flush(id).unwrap();
        guard.record().clone()
    }

    #[test]
    fn drain_empties_pending() {
        let collector = HistoryCollector::new(10);
        let observer = ObserverId::new();
        collector.track(observer);
        collector.track(observer);

        assert_eq!(collector.drain(), vec![observer, observer]);
        assert!(collector.pending().is_empty());
    }

    #[test]
    fn save_without_tree_records_nothing() {
        let collector = HistoryCollector::new(10);
        let scheduler = BatchScheduler::new();
        collector.save(&record(&scheduler, "noop"));
        assert!(collector.timeline().is_empty());
    }

    #[test]
    fn save_captures_attached_tree_with_attribution() {
        let (collector, tree) = HistoryCollector::with_memory_tree(10);
        tree.register("counter", json!({"count": 1})).unwrap();
        let scheduler = BatchScheduler::new();

        collector.save(&record(&scheduler, "increment"));

        let timeline = collector.timeline();
        let snapshot = timeline.current().unwrap();
        assert_eq!(snapshot.state, json!({"counter": {"count": 1}}));
        assert_eq!(snapshot.actions, vec!["increment".to_string()]);
        assert_eq!(snapshot.batch, Some(1));
    }

    #[test]
    fn travel_without_history_fails() {
        let collector = HistoryCollector::new(10);
        assert_eq!(collector.travel(-1).unwrap_err(), HistoryError::Empty);
    }
}
