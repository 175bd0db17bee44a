//! Deferred flushes on a real event loop: `LocalSpawner` inside a tokio
//! `LocalSet`. The flush runs once the dispatching task yields.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};
use tacky_store::{
    Action, HistoryCollector, LocalSpawner, ObserverId, Store, StoreConfig, StoreDeps,
};
use tokio::task::LocalSet;

fn store_on_local_set() -> (Store, Rc<tacky_store::MemoryStateTree>) {
    let (collector, tree) = HistoryCollector::with_memory_tree(10);
    tree.register("counter", json!({"count": 0})).unwrap();

    let deps = StoreDeps::builder()
        .tree(tree.clone())
        .tracker(collector.clone())
        .recorder(collector)
        .scheduler(Rc::new(LocalSpawner))
        .build();
    (Store::new(deps, &StoreConfig::default()), tree)
}

fn increment(tree: &Rc<tacky_store::MemoryStateTree>, value: i64) -> Action {
    let tree = tree.clone();
    Action::mutation("inc", move |args| {
        tree.write("counter", "count", args.first().cloned().unwrap_or(Value::Null))?;
        Ok(())
    })
    .with_arg(value)
}

#[tokio::test]
async fn batched_flush_runs_after_the_dispatching_task_yields() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (store, tree) = store_on_local_set();
            let observer = ObserverId::new();
            tree.read(observer, "counter", "count").unwrap();

            let seen = Rc::new(RefCell::new(Vec::new()));
            let log = seen.clone();
            let reader = tree.clone();
            let _sub = store.subscribe(
                Rc::new(move || {
                    let count = reader.peek("counter", "count").unwrap();
                    log.borrow_mut().push(count);
                }),
                observer,
            );

            store.dispatch(increment(&tree, 1)).unwrap();
            store.dispatch(increment(&tree, 2)).unwrap();
            assert!(seen.borrow().is_empty());
            assert!(store.has_pending_flush());

            tokio::task::yield_now().await;

            assert_eq!(*seen.borrow(), vec![Some(json!(2))]);
            assert!(!store.has_pending_flush());
        })
        .await;
}

#[tokio::test]
async fn atom_on_event_loop_does_not_wait_for_the_tick() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (store, tree) = store_on_local_set();
            let observer = ObserverId::new();
            tree.read(observer, "counter", "count").unwrap();

            let hits = Rc::new(RefCell::new(0));
            let counter = hits.clone();
            let _sub = store.subscribe(Rc::new(move || *counter.borrow_mut() += 1), observer);

            store.dispatch(increment(&tree, 5).atom(true)).unwrap();
            assert_eq!(*hits.borrow(), 1);

            tokio::task::yield_now().await;
            assert_eq!(*hits.borrow(), 1);
        })
        .await;
}
