use std::io;

use thiserror::Error;

use crate::session::SessionPhase;

/// Failures of the local key-value store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("key-value store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("key-value store serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// A transition invoked outside of its precondition.
///
/// The session is left untouched when this is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid state transition: cannot {operation} from {phase:?}")]
    InvalidTransition {
        operation: &'static str,
        phase: SessionPhase,
    },
}

/// Failures of the workout document store
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("workout database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("workout database I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("user not authenticated")]
    NotAuthenticated,

    #[error("invalid workout record: {0}")]
    InvalidRecord(String),
}
