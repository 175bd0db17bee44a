//! Mutation dispatch engine for a reactive state container.
//!
//! Runs one mutation at a time, tracks which observers the mutation affected,
//! and notifies exactly those observers: batched per tick for ordinary
//! mutations, synchronously for atom updates, deduplicated, and applied as a
//! single host update pass.
//!
//! Consumers plug in their environment by implementing the traits in
//! [`traits`]: the state tree, dependency tracker, history recorder,
//! next-tick scheduler, and host batched-update primitive. In-memory versions
//! of each ship with the crate.

pub mod action;
pub mod batch;
pub mod collector;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod observer;
pub mod registry;
pub mod traits;
pub mod tree;

pub use action::{Action, ActionType, Mutation};
pub use batch::{deduplicate, BatchId, BatchRecord, BatchScheduler};
pub use collector::HistoryCollector;
pub use config::StoreConfig;
pub use engine::{Store, StoreDeps, TRAVEL_ACTION};
pub use error::{Result, StoreError};
pub use host::{DirectHost, LocalSpawner, TaskQueue};
pub use observer::ObserverId;
pub use registry::{Listener, Subscription, SubscriptionRegistry};
pub use traits::{DependencyTracker, HistoryRecorder, RenderHost, Scheduler, StateTree, Task};
pub use tree::MemoryStateTree;
