//! The dispatch loop.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, trace, warn};
use typed_builder::TypedBuilder;

use crate::action::Action;
use crate::batch::{deduplicate, BatchId, BatchScheduler};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::host::{DirectHost, TaskQueue};
use crate::observer::ObserverId;
use crate::registry::{Listener, Subscription, SubscriptionRegistry};
use crate::traits::{DependencyTracker, HistoryRecorder, RenderHost, Scheduler, StateTree};

/// Name of the internal action that applies a time-travel restore.
pub const TRAVEL_ACTION: &str = "@@tacky/travel";

/// Collaborators injected into a [`Store`].
#[derive(Clone, TypedBuilder)]
pub struct StoreDeps {
    pub tree: Rc<dyn StateTree>,
    pub tracker: Rc<dyn DependencyTracker>,
    pub recorder: Rc<dyn HistoryRecorder>,
    #[builder(default = Rc::new(TaskQueue::new()) as Rc<dyn Scheduler>)]
    pub scheduler: Rc<dyn Scheduler>,
    #[builder(default = Rc::new(DirectHost) as Rc<dyn RenderHost>)]
    pub host: Rc<dyn RenderHost>,
}

/// Mutation dispatch engine.
///
/// Run a mutation exclusively → open a batch → flush now (atom) or on the
/// next tick (everything else) → notify affected observers in one host pass.
/// Cloning a `Store` creates a new handle to the **same** store.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

struct StoreInner {
    batch: BatchScheduler,
    registry: Rc<SubscriptionRegistry>,
    deps: StoreDeps,
    time_travel: Cell<bool>,
}

impl Store {
    pub fn new(deps: StoreDeps, config: &StoreConfig) -> Self {
        config.log();
        Self {
            inner: Rc::new(StoreInner {
                batch: BatchScheduler::new(),
                registry: Rc::new(SubscriptionRegistry::new()),
                deps,
                time_travel: Cell::new(config.time_travel),
            }),
        }
    }

    /// Run `action`'s mutation and schedule notification of the observers it
    /// affected.
    ///
    /// Returns the action back for `MUTATION`/`UPDATE`, `None` for any other
    /// type (which is not executed). Fails with [`StoreError::Reentrancy`]
    /// when called from inside a running mutation; mutation errors propagate
    /// unchanged apart from wrapping.
    pub fn dispatch(&self, action: Action) -> Result<Option<Action>> {
        let inner = &self.inner;

        if inner.batch.is_updating() {
            warn!(action = %action.name, "dispatch rejected, mutation already executing");
            return Err(StoreError::Reentrancy {
                action: action.name,
            });
        }

        // Atoms must observe fully settled prior state.
        if action.is_atom {
            if let Some(pending) = inner.batch.take_dirty() {
                debug!(action = %action.name, batch = %pending, "atom pre-empting deferred flush");
                inner.flush(pending);
            }
        }

        {
            let _updating = inner.batch.begin_update();
            if !action.kind.is_executable() {
                debug!(action = %action.name, kind = %action.kind, "action type ignored");
                return Ok(None);
            }

            (action.original)(&action.payload).map_err(|source| {
                warn!(action = %action.name, error = %source, "mutation failed");
                StoreError::Mutation {
                    action: action.name.clone(),
                    source,
                }
            })?;
        }

        inner.batch.note_action(&action.name);
        debug!(
            action = %action.name,
            kind = %action.kind,
            namespace = action.namespace.as_deref().unwrap_or("-"),
            atom = action.is_atom,
            "mutation applied"
        );

        if let Some(batch) = inner.batch.open() {
            if action.is_atom {
                inner.flush(batch);
                inner.batch.consume(batch);
            } else {
                inner.defer(batch);
            }
        }

        Ok(Some(action))
    }

    /// Register `listener` for `observer`.
    ///
    /// The same listener (by `Rc` identity) is registered once per observer.
    /// The returned handle's `unsubscribe` removes **all** of the observer's
    /// listeners.
    pub fn subscribe(&self, listener: Listener, observer: ObserverId) -> Subscription {
        if self.inner.registry.add(observer, listener) {
            trace!(observer = %observer, "listener registered");
        }
        Subscription::new(observer, &self.inner.registry)
    }

    /// Plain-value copy of `namespace`, or of the whole tree for `None`.
    pub fn get_state(&self, namespace: Option<&str>) -> Result<Value> {
        if self.inner.batch.is_updating() {
            return Err(StoreError::ReadDuringMutation);
        }

        self.inner
            .deps
            .tree
            .snapshot(namespace)
            .ok_or_else(|| StoreError::UnknownNamespace(namespace.unwrap_or_default().to_string()))
    }

    /// Move the history cursor by `delta` and restore that state.
    ///
    /// The restore runs as an atom `UPDATE`, so affected observers are
    /// notified before this returns.
    pub fn travel(&self, delta: isize) -> Result<()> {
        if self.inner.batch.is_updating() {
            return Err(StoreError::Reentrancy {
                action: TRAVEL_ACTION.to_string(),
            });
        }

        // Settle the pending batch first so its snapshot lands before the
        // cursor moves.
        if let Some(pending) = self.inner.batch.take_dirty() {
            debug!(batch = %pending, "flushing pending batch before time travel");
            self.inner.flush(pending);
        }

        let snapshot = self.inner.deps.recorder.travel(delta)?;
        info!(delta, "time travel");

        let tree = Rc::clone(&self.inner.deps.tree);
        self.dispatch(Action::update(TRAVEL_ACTION, move |_| tree.restore(&snapshot)))?;
        Ok(())
    }

    pub fn set_time_travel(&self, enabled: bool) {
        self.inner.time_travel.set(enabled);
    }

    pub fn time_travel_active(&self) -> bool {
        self.inner.time_travel.get()
    }

    pub fn is_updating(&self) -> bool {
        self.inner.batch.is_updating()
    }

    /// Whether a deferred flush is waiting for the next tick.
    pub fn has_pending_flush(&self) -> bool {
        self.inner.batch.has_pending_flush()
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.inner.registry
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("batch", &self.inner.batch)
            .field("registry", &self.inner.registry)
            .field("time_travel", &self.inner.time_travel.get())
            .finish()
    }
}

impl StoreInner {
    /// Park `batch` and run its flush on the next tick.
    fn defer(self: &Rc<Self>, batch: BatchId) {
        self.batch.park(batch);
        // A task that outlives the store does nothing.
        let weak = Rc::downgrade(self);
        self.deps.scheduler.schedule(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.flush(batch);
            }
        }));
        trace!(batch = %batch, "flush deferred to next tick");
    }

    fn flush(self: &Rc<Self>, batch: BatchId) {
        let Some(guard) = self.batch.begin_flush(batch) else {
            trace!(batch = %batch, "stale flush skipped");
            return;
        };

        let observers = deduplicate(self.deps.tracker.drain());
        if !observers.is_empty() {
            let listeners = self.registry.resolve(&observers);
            debug!(
                batch = %batch,
                observers = observers.len(),
                listeners = listeners.len(),
                "notifying observers"
            );
            self.deps.host.batched_updates(&mut || {
                for listener in &listeners {
                    listener();
                }
            });
        }

        if self.time_travel.get() {
            self.deps.recorder.save(guard.record());
        }
        self.deps.recorder.end_batch();
        drop(guard);

        // Listeners dispatched while the batch was flushing; their changes
        // get a batch of their own.
        if self.batch.has_unflushed_actions() {
            if let Some(follow_up) = self.batch.open() {
                debug!(batch = %batch, follow_up = %follow_up, "dispatches during flush, scheduling follow-up");
                self.defer(follow_up);
            }
        }
    }
}
