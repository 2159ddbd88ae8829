//! Storage contract for the Opal ledger.
//!
//! This crate defines the abstract append-only, optimistic-concurrency
//! store the rest of the system consumes:
//! - [`StorageEngine`] — atomic batch commits with compare-and-swap version
//!   tokens
//! - [`LedgerQueries`] — read helpers for the query endpoints
//! - [`AnchorStore`] — checkpoint persistence for the anchor builder
//! - [`InMemoryLedger`] — reference engine for tests and embedding
//!
//! Durable backends (file, relational) implement the same traits out of
//! tree; the core never depends on a concrete engine.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryLedger;
pub use traits::{AnchorStore, LedgerQueries, StorageEngine};
