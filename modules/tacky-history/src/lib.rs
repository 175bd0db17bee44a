//! Generic, domain-agnostic snapshot timeline.
//!
//! Holds opaque JSON states captured once per flushed batch, with a cursor
//! that supports stepping backwards and forwards through them.
//! Zero knowledge of observers, actions, or how a state tree is stored.

pub mod error;
pub mod timeline;
pub mod types;

pub use error::HistoryError;
pub use timeline::Timeline;
pub use types::Snapshot;
