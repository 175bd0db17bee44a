//! Subscription registry: observer identity → notification callbacks.
//!
//! Removal is per observer, not per listener. Unsubscribing any one handle
//! clears every listener registered for that observer.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::observer::ObserverId;

/// Zero-argument notification callback. Identity is the `Rc` allocation.
pub type Listener = Rc<dyn Fn()>;

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    listeners: RefCell<HashMap<ObserverId, Vec<Listener>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `observer`. Returns `false` when the same
    /// listener was already registered for it.
    pub(crate) fn add(&self, observer: ObserverId, listener: Listener) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let entry = listeners.entry(observer).or_default();
        if entry.iter().any(|existing| same_listener(existing, &listener)) {
            return false;
        }
        entry.push(listener);
        true
    }

    /// Drop every listener of `observer`. Returns whether anything was removed.
    pub(crate) fn remove(&self, observer: ObserverId) -> bool {
        self.listeners.borrow_mut().remove(&observer).is_some()
    }

    /// Listeners for `observers`, concatenated in the given observer order and
    /// per-observer registration order. Unknown observers contribute nothing.
    ///
    /// Returns owned handles so listeners may subscribe or unsubscribe while
    /// they run.
    pub(crate) fn resolve(&self, observers: &[ObserverId]) -> Vec<Listener> {
        let listeners = self.listeners.borrow();
        observers
            .iter()
            .filter_map(|observer| listeners.get(observer))
            .flat_map(|registered| registered.iter().cloned())
            .collect()
    }

    pub fn listener_count(&self, observer: ObserverId) -> usize {
        self.listeners
            .borrow()
            .get(&observer)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn observer_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Handle returned by [`Store::subscribe`](crate::Store::subscribe).
///
/// Holds the registry weakly. Dropping the handle does not unsubscribe;
/// the observer's owner calls [`unsubscribe`](Self::unsubscribe) on teardown.
pub struct Subscription {
    observer: ObserverId,
    registry: Weak<SubscriptionRegistry>,
    active: Cell<bool>,
}

impl Subscription {
    pub(crate) fn new(observer: ObserverId, registry: &Rc<SubscriptionRegistry>) -> Self {
        Self {
            observer,
            registry: Rc::downgrade(registry),
            active: Cell::new(true),
        }
    }

    pub fn observer(&self) -> ObserverId {
        self.observer
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Remove every listener of this handle's observer. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }

        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.observer) {
                trace!(observer = %self.observer, "observer unsubscribed");
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("observer", &self.observer)
            .field("active", &self.active.get())
            .finish()
    }
}
