use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History is empty")]
    Empty,

    #[error("Cannot move {delta} step(s) from position {cursor}: timeline holds {len} snapshot(s)")]
    OutOfRange { cursor: usize, delta: isize, len: usize },

    #[error("Time travel is not supported by this recorder")]
    Unsupported,
}
