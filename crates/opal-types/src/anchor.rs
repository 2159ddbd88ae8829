use serde::{Deserialize, Serialize};

use crate::txid::TxId;

/// A tamper-evident checkpoint over the committed transaction log.
///
/// `position` is the hash of the last transaction the checkpoint covers and
/// strictly advances in log order. `full_store_hash` is the rolling chain
/// hash folded over every transaction since genesis, so two stores with the
/// same log contents always produce the same anchor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerAnchor {
    /// Hash of the last transaction included in this checkpoint.
    pub position: TxId,
    /// Rolling chain hash over the full transaction log.
    pub full_store_hash: TxId,
    /// Running total of transactions covered.
    pub transaction_count: u64,
}

impl LedgerAnchor {
    pub fn new(position: TxId, full_store_hash: TxId, transaction_count: u64) -> Self {
        Self {
            position,
            full_store_hash,
            transaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let anchor = LedgerAnchor::new(TxId::compute(b"a"), TxId::compute(b"b"), 7);
        let json = serde_json::to_string(&anchor).unwrap();
        let back: LedgerAnchor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, anchor);
    }
}
