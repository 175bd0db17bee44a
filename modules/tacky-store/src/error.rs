use tacky_history::HistoryError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot dispatch `{action}` while another mutation is executing")]
    Reentrancy { action: String },

    #[error("Mutation `{action}` failed: {source}")]
    Mutation {
        action: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("State cannot be read while a mutation is executing")]
    ReadDuringMutation,

    #[error("Unknown namespace: {0}")]
    UnknownNamespace(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl StoreError {
    pub fn is_reentrancy(&self) -> bool {
        matches!(self, StoreError::Reentrancy { .. })
    }
}
