//! Core types for the timeline. Domain-agnostic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One captured state. Returned by all timeline read methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monotonic per timeline; never reused, even after eviction.
    pub seq: u64,
    pub ts: DateTime<Utc>,
    /// Batch that produced this state, if the caller attributes one.
    pub batch: Option<u64>,
    /// Names of the actions folded into that batch, in dispatch order.
    pub actions: Vec<String>,
    pub state: serde_json::Value,
}

impl Snapshot {
    pub fn is_attributed(&self) -> bool {
        self.batch.is_some()
    }
}
