//! Shared fixtures for store integration tests.
//!
//! Wires a [`Store`] to the in-memory tree and collector, a manually drained
//! task queue, and a host that counts update passes. Listeners append their
//! label to a shared log so tests can assert notification order.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::Value;
use tacky_store::{
    Action, HistoryCollector, Listener, MemoryStateTree, ObserverId, RenderHost, Store,
    StoreConfig, StoreDeps, Subscription, TaskQueue,
};

/// Install a fmt subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Host that counts how many combined update passes it was asked to run.
#[derive(Default)]
pub struct CountingHost {
    passes: Cell<usize>,
}

impl CountingHost {
    pub fn passes(&self) -> usize {
        self.passes.get()
    }
}

impl RenderHost for CountingHost {
    fn batched_updates(&self, run: &mut dyn FnMut()) {
        self.passes.set(self.passes.get() + 1);
        run();
    }
}

pub struct TestStore {
    pub store: Store,
    pub tree: Rc<MemoryStateTree>,
    pub collector: Rc<HistoryCollector>,
    pub queue: Rc<TaskQueue>,
    pub host: Rc<CountingHost>,
    log: Rc<RefCell<Vec<String>>>,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        init_tracing();

        let (collector, tree) = HistoryCollector::with_memory_tree(config.history_limit);
        let queue = Rc::new(TaskQueue::new());
        let host = Rc::new(CountingHost::default());

        let deps = StoreDeps::builder()
            .tree(tree.clone())
            .tracker(collector.clone())
            .recorder(collector.clone())
            .scheduler(queue.clone())
            .host(host.clone())
            .build();

        tree.register("counter", serde_json::json!({"count": 0}))
            .expect("counter namespace registers");
        tree.register("profile", serde_json::json!({"name": "ada"}))
            .expect("profile namespace registers");

        Self {
            store: Store::new(deps, &config),
            tree,
            collector,
            queue,
            host,
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Listener that appends `label` to the notification log.
    pub fn listener(&self, label: &str) -> Listener {
        let log = self.log.clone();
        let label = label.to_string();
        Rc::new(move || log.borrow_mut().push(label.clone()))
    }

    /// New observer that depends on `namespace.key` and logs `label` when
    /// notified.
    pub fn watch(&self, label: &str, namespace: &str, key: &str) -> (ObserverId, Subscription) {
        let observer = ObserverId::new();
        self.tree
            .read(observer, namespace, key)
            .expect("watched namespace exists");
        let subscription = self.store.subscribe(self.listener(label), observer);
        (observer, subscription)
    }

    /// Batched mutation writing its first argument to `namespace.key`.
    pub fn set(&self, name: &str, namespace: &str, key: &str, value: impl Into<Value>) -> Action {
        let tree = self.tree.clone();
        let (ns, k) = (namespace.to_string(), key.to_string());
        Action::mutation(name, move |args| {
            let value = args.first().cloned().unwrap_or(Value::Null);
            tree.write(&ns, &k, value)?;
            Ok(())
        })
        .with_arg(value)
        .with_namespace(namespace)
    }

    /// Atom update writing its first argument to `namespace.key`.
    pub fn set_atom(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: impl Into<Value>,
    ) -> Action {
        self.set(name, namespace, key, value).atom(true)
    }

    /// Run everything deferred to the next tick.
    pub fn tick(&self) -> usize {
        self.queue.run_until_idle()
    }

    /// Take the notification log.
    pub fn notified(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    pub fn count(&self) -> Value {
        self.tree
            .peek("counter", "count")
            .expect("counter namespace exists")
            .unwrap_or(Value::Null)
    }
}
