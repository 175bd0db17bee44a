//! In-memory state tree with read tracking.
//!
//! Each namespace is a JSON object. Reads made on behalf of an observer
//! register it as a reader of `(namespace, key)`; a write that changes the
//! value reports every reader to the [`DependencyTracker`].

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

use anyhow::anyhow;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::observer::ObserverId;
use crate::traits::{DependencyTracker, StateTree};

type SlotKey = (String, String);

pub struct MemoryStateTree {
    state: RefCell<Map<String, Value>>,
    readers: RefCell<HashMap<SlotKey, Vec<ObserverId>>>,
    tracker: Rc<dyn DependencyTracker>,
}

impl MemoryStateTree {
    pub fn new(tracker: Rc<dyn DependencyTracker>) -> Self {
        Self {
            state: RefCell::new(Map::new()),
            readers: RefCell::new(HashMap::new()),
            tracker,
        }
    }

    /// Add a namespace. `initial` must be a JSON object.
    pub fn register(&self, namespace: impl Into<String>, initial: Value) -> Result<()> {
        let namespace = namespace.into();
        if !initial.is_object() {
            return Err(StoreError::InvalidState(format!(
                "namespace `{namespace}` must be an object"
            )));
        }

        let mut state = self.state.borrow_mut();
        if state.contains_key(&namespace) {
            return Err(StoreError::InvalidState(format!(
                "namespace `{namespace}` is already registered"
            )));
        }
        debug!(namespace = %namespace, "namespace registered");
        state.insert(namespace, initial);
        Ok(())
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.state.borrow().keys().cloned().collect()
    }

    /// Read a value on behalf of `observer`, recording the dependency.
    pub fn read(&self, observer: ObserverId, namespace: &str, key: &str) -> Result<Option<Value>> {
        let value = self.peek(namespace, key)?;

        let mut readers = self.readers.borrow_mut();
        let entry = readers
            .entry((namespace.to_string(), key.to_string()))
            .or_default();
        if !entry.contains(&observer) {
            entry.push(observer);
        }
        Ok(value)
    }

    /// Read a value without recording a dependency.
    pub fn peek(&self, namespace: &str, key: &str) -> Result<Option<Value>> {
        let state = self.state.borrow();
        let slots = state
            .get(namespace)
            .and_then(Value::as_object)
            .ok_or_else(|| StoreError::UnknownNamespace(namespace.to_string()))?;
        Ok(slots.get(key).cloned())
    }

    /// Store `value`. Returns whether it changed; unchanged writes notify no one.
    pub fn write(&self, namespace: &str, key: &str, value: Value) -> Result<bool> {
        {
            let mut state = self.state.borrow_mut();
            let slots = state
                .get_mut(namespace)
                .and_then(Value::as_object_mut)
                .ok_or_else(|| StoreError::UnknownNamespace(namespace.to_string()))?;
            if slots.get(key) == Some(&value) {
                return Ok(false);
            }
            slots.insert(key.to_string(), value);
        }

        self.notify_readers(namespace, key);
        Ok(true)
    }

    /// Drop every dependency recorded for `observer`.
    pub fn forget(&self, observer: ObserverId) {
        let mut readers = self.readers.borrow_mut();
        readers.retain(|_, observers| {
            observers.retain(|o| *o != observer);
            !observers.is_empty()
        });
    }

    fn notify_readers(&self, namespace: &str, key: &str) {
        let affected = self
            .readers
            .borrow()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
            .unwrap_or_default();

        trace!(namespace, key, readers = affected.len(), "slot changed");
        for observer in affected {
            self.tracker.track(observer);
        }
    }
}

impl StateTree for MemoryStateTree {
    fn snapshot(&self, namespace: Option<&str>) -> Option<Value> {
        let state = self.state.borrow();
        match namespace {
            Some(namespace) => state.get(namespace).cloned(),
            None => Some(Value::Object(state.clone())),
        }
    }

    fn restore(&self, snapshot: &Value) -> anyhow::Result<()> {
        let incoming = snapshot
            .as_object()
            .ok_or_else(|| anyhow!("snapshot must be an object of namespaces"))?;
        if let Some((namespace, _)) = incoming.iter().find(|(_, v)| !v.is_object()) {
            return Err(anyhow!("snapshot namespace `{namespace}` is not an object"));
        }

        let changed: Vec<SlotKey> = {
            let current = self.state.borrow();
            let empty = Map::new();
            let namespaces: BTreeSet<&String> = current.keys().chain(incoming.keys()).collect();

            let mut changed = Vec::new();
            for namespace in namespaces {
                let before = current
                    .get(namespace)
                    .and_then(Value::as_object)
                    .unwrap_or(&empty);
                let after = incoming
                    .get(namespace)
                    .and_then(Value::as_object)
                    .unwrap_or(&empty);
                let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
                for key in keys {
                    if before.get(key) != after.get(key) {
                        changed.push((namespace.clone(), key.clone()));
                    }
                }
            }
            changed
        };

        *self.state.borrow_mut() = incoming.clone();
        debug!(slots = changed.len(), "state tree restored");

        for (namespace, key) in changed {
            self.notify_readers(&namespace, &key);
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryStateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStateTree")
            .field("state", &self.state.borrow())
            .finish_non_exhaustive()
    }
}
