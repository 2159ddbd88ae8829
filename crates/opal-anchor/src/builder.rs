use std::sync::Arc;

use opal_crypto::fold_anchor_hash;
use opal_store::{AnchorStore, StorageEngine};
use opal_types::{LedgerAnchor, TxId};

use crate::error::AnchorResult;

/// Computes rolling checkpoints over the committed transaction log.
///
/// The chain starts from an all-zero 32-byte seed and folds every
/// transaction hash in log order; each anchor extends the last persisted
/// one. Recomputation from the last checkpoint is deterministic, so a crash
/// between computing and persisting never produces a duplicate or partial
/// anchor.
pub struct AnchorBuilder<S> {
    storage: Arc<S>,
}

impl<S: StorageEngine + AnchorStore> AnchorBuilder<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Build the next anchor, or `None` when no transaction has been
    /// committed since the last checkpoint.
    pub async fn create_anchor(&self) -> AnchorResult<Option<LedgerAnchor>> {
        let last = self.storage.get_last_anchor().await?;
        let (mut chain, previous_count, since) = match &last {
            Some(anchor) => (
                anchor.full_store_hash,
                anchor.transaction_count,
                Some(&anchor.position),
            ),
            None => (TxId::zero(), 0, None),
        };

        let transactions = self.storage.transactions_since(since).await?;
        if transactions.is_empty() {
            return Ok(None);
        }

        let mut position = TxId::zero();
        for raw in &transactions {
            position = TxId::compute(raw.as_bytes());
            chain = fold_anchor_hash(&chain, &position);
        }

        Ok(Some(LedgerAnchor {
            position,
            full_store_hash: chain,
            transaction_count: previous_count + transactions.len() as u64,
        }))
    }

    /// Persist an anchor as the baseline for the next cycle. Called only
    /// after the external recorder has confirmed it.
    pub async fn commit_anchor(&self, anchor: &LedgerAnchor) -> AnchorResult<()> {
        self.storage.commit_anchor(anchor).await?;
        Ok(())
    }
}
