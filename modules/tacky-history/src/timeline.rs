//! Timeline: bounded, cursor-addressed list of snapshots.
//!
//! Recording after stepping backwards discards the entries ahead of the
//! cursor, the same way an editor drops its redo stack on a fresh edit.

use std::collections::VecDeque;

use chrono::Utc;
use tracing::{debug, trace};

use crate::error::HistoryError;
use crate::types::Snapshot;

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Timeline {
    entries: VecDeque<Snapshot>,
    /// Index into `entries`; `None` only while empty.
    cursor: Option<usize>,
    limit: usize,
    next_seq: u64,
}

impl Timeline {
    /// A limit of zero is treated as one; a timeline always keeps the
    /// snapshot under its cursor.
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: None,
            limit: limit.max(1),
            next_seq: 1,
        }
    }

    /// Append a state after the cursor.
    ///
    /// Returns `None` without touching the timeline when `state` equals the
    /// snapshot under the cursor.
    pub fn record(
        &mut self,
        state: serde_json::Value,
        batch: Option<u64>,
        actions: Vec<String>,
    ) -> Option<&Snapshot> {
        if let Some(current) = self.current() {
            if current.state == state {
                trace!(seq = current.seq, "state unchanged, snapshot skipped");
                return None;
            }
        }

        if let Some(cursor) = self.cursor {
            let discarded = self.entries.len() - (cursor + 1);
            if discarded > 0 {
                debug!(discarded, "dropping snapshots ahead of cursor");
                self.entries.truncate(cursor + 1);
            }
        }

        let snapshot = Snapshot {
            seq: self.next_seq,
            ts: Utc::now(),
            batch,
            actions,
            state,
        };
        self.next_seq += 1;
        self.entries.push_back(snapshot);

        while self.entries.len() > self.limit {
            if let Some(evicted) = self.entries.pop_front() {
                trace!(seq = evicted.seq, "evicted oldest snapshot");
            }
        }

        self.cursor = Some(self.entries.len() - 1);
        self.entries.back()
    }

    /// Move the cursor by `delta` (negative = back in time) and return the
    /// snapshot it lands on. A failed move leaves the cursor where it was.
    pub fn travel(&mut self, delta: isize) -> Result<&Snapshot, HistoryError> {
        let cursor = self.cursor.ok_or(HistoryError::Empty)?;
        let len = self.entries.len();

        let target = cursor
            .checked_add_signed(delta)
            .filter(|target| *target < len)
            .ok_or(HistoryError::OutOfRange { cursor, delta, len })?;

        self.cursor = Some(target);
        Ok(&self.entries[target])
    }

    /// Snapshot under the cursor.
    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|cursor| self.entries.get(cursor))
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.entries.len())
    }

    pub fn entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Drop every snapshot. Sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
