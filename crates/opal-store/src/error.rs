use opal_types::{ByteString, TypeError};
use thiserror::Error;

/// Errors produced by storage engines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A record named a version token that no longer matches the stored one.
    /// The whole batch was rejected; nothing changed.
    #[error("concurrent mutation on key {key}")]
    ConcurrentMutation { key: ByteString },

    /// A transaction in the batch could not be decoded.
    #[error("undecodable transaction: {0}")]
    UndecodableTransaction(#[from] TypeError),

    /// The stored data violates an engine invariant.
    #[error("corrupted store: {0}")]
    Corrupted(String),

    /// Backend-specific failure (I/O, connectivity).
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
