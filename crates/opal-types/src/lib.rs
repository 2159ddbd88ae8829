//! Foundation types for the Opal ledger.
//!
//! This crate provides the path, record and transaction data model used
//! throughout the system, plus the canonical wire codec. Every other Opal
//! crate depends on `opal-types`.
//!
//! # Key Types
//!
//! - [`LedgerPath`] — hierarchical directory/leaf path with prefix containment
//! - [`ByteString`] — immutable byte string (keys, values, version tokens)
//! - [`Record`] / [`Mutation`] / [`Transaction`] — the mutation data model
//! - [`AccountKey`] / [`AccountStatus`] — one balance slot and its state
//! - [`TxId`] — double-SHA-256 digest identifying transactions and anchors
//! - [`LedgerAnchor`] — rolling checkpoint over the transaction log

pub mod account;
pub mod anchor;
pub mod bytes;
pub mod error;
pub mod path;
pub mod record;
pub mod txid;
pub mod wire;

pub use account::{
    decode_balance, encode_balance, AccountKey, AccountStatus, RecordKey, RecordType,
};
pub use anchor::LedgerAnchor;
pub use bytes::ByteString;
pub use error::TypeError;
pub use path::LedgerPath;
pub use record::{Mutation, Record, Transaction, MAX_KEY_SIZE};
pub use txid::TxId;
pub use wire::{
    deserialize_mutation, deserialize_transaction, serialize_mutation, serialize_transaction,
};
