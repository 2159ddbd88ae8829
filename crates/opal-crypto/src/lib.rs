//! Cryptographic primitives for the Opal ledger.
//!
//! Provides Ed25519 signature evidence verification and the anchor hash
//! chain fold. Hashing itself lives on [`opal_types::TxId`] (double SHA-256),
//! shared by transaction ids, signature payloads and anchor links.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod chain;
pub mod evidence;

pub use chain::fold_anchor_hash;
pub use evidence::{SignatureEvidence, SigningKey};
