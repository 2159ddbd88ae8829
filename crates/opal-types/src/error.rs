use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("malformed ledger path: {0}")]
    MalformedPath(String),

    #[error("invalid record key")]
    InvalidRecordKey,

    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
