use opal_types::TxId;

/// Fold one transaction hash into a rolling anchor chain hash.
///
/// `next = DoubleSHA256(current ‖ tx_hash)` over the 64-byte concatenation.
/// Starting from [`TxId::zero`] and folding every transaction hash in log
/// order reproduces any anchor's `full_store_hash`, which is what makes
/// anchor recomputation after a crash idempotent.
pub fn fold_anchor_hash(current: &TxId, tx_hash: &TxId) -> TxId {
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(current.as_bytes());
    buffer[32..].copy_from_slice(tx_hash.as_bytes());
    TxId::compute(&buffer)
}
