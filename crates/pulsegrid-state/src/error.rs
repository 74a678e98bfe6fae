//! Errors raised by the state mirror.
//!
//! Table-level failures carry the mirror table they hit, and entry-level
//! ones the key as well, so a corrupt row can be found and removed.

use thiserror::Error;

/// Result type alias for state mirror operations.
pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("cannot open state mirror: {0}")]
    Open(String),

    #[error("state mirror transaction failed: {0}")]
    Transaction(String),

    #[error("mirror table `{table}` unavailable: {reason}")]
    Table { table: &'static str, reason: String },

    #[error("reading mirror table `{table}` failed: {reason}")]
    Read { table: &'static str, reason: String },

    #[error("writing `{key}` to mirror table `{table}` failed: {reason}")]
    Write {
        table: &'static str,
        key: String,
        reason: String,
    },

    #[error("cannot encode `{key}` for mirror table `{table}`: {reason}")]
    Encode {
        table: &'static str,
        key: String,
        reason: String,
    },

    #[error("corrupt entry `{key}` in mirror table `{table}`: {reason}")]
    Corrupt {
        table: &'static str,
        key: String,
        reason: String,
    },
}

impl StateError {
    /// The mirror table involved, if the failure is tied to one.
    pub fn table(&self) -> Option<&'static str> {
        match self {
            Self::Open(_) | Self::Transaction(_) => None,
            Self::Table { table, .. }
            | Self::Read { table, .. }
            | Self::Write { table, .. }
            | Self::Encode { table, .. }
            | Self::Corrupt { table, .. } => Some(*table),
        }
    }
}
