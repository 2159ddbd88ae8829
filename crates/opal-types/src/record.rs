use serde::{Deserialize, Serialize};

use crate::bytes::ByteString;

/// Maximum allowed record key size, in bytes.
pub const MAX_KEY_SIZE: usize = 512;

/// One versioned key/value write inside a mutation.
///
/// `value: None` means the record carries no new value on the wire; the
/// version token is still checked at commit, so such a record acts as a
/// deletion marker. The empty version token means "create": the key must not
/// exist yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: ByteString,
    pub value: Option<ByteString>,
    pub version: ByteString,
}

impl Record {
    pub fn new(key: ByteString, value: Option<ByteString>, version: ByteString) -> Self {
        Self { key, value, version }
    }
}

/// The unit a client signs and submits: a namespace, an ordered list of
/// records, and an opaque metadata blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mutation {
    pub namespace: ByteString,
    pub records: Vec<Record>,
    pub metadata: ByteString,
}

impl Mutation {
    pub fn new(namespace: ByteString, records: Vec<Record>, metadata: ByteString) -> Self {
        Self {
            namespace,
            records,
            metadata,
        }
    }
}

/// A committed ledger entry: the raw mutation bytes (immutable once stored),
/// the UTC commit timestamp in unix seconds, and serialized metadata carrying
/// the signature evidence.
///
/// A transaction is identified by the double-SHA-256 hash of its serialized
/// form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub mutation: ByteString,
    pub timestamp: u64,
    pub metadata: ByteString,
}

impl Transaction {
    pub fn new(mutation: ByteString, timestamp: u64, metadata: ByteString) -> Self {
        Self {
            mutation,
            timestamp,
            metadata,
        }
    }
}
