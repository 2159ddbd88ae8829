use std::collections::HashMap;

use async_trait::async_trait;

use opal_types::{
    decode_balance, AccountKey, AccountStatus, ByteString, LedgerAnchor, LedgerPath, Record, TxId,
};

use crate::error::{StoreError, StoreResult};

/// The authoritative append-only ledger store.
///
/// All implementations must satisfy these invariants:
/// - Transactions, once committed, are never mutated or removed.
/// - `add_transactions` is atomic across the whole batch: either every
///   record write applies or none does.
/// - A record write naming a stale version token rejects the batch with
///   [`StoreError::ConcurrentMutation`]. Two concurrent batches touching an
///   overlapping key cannot both succeed.
/// - On success, every touched key's version token becomes the hash of the
///   committing transaction.
/// - Readers observe only committed state; an in-flight batch is invisible.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    /// Read the current state of the given balance slots.
    ///
    /// Every requested key is present in the result; keys never written
    /// return [`AccountStatus::missing`] (zero balance, empty version).
    async fn get_accounts(
        &self,
        keys: &[AccountKey],
    ) -> StoreResult<HashMap<AccountKey, AccountStatus>> {
        let record_keys: Vec<ByteString> = keys.iter().map(AccountKey::record_key).collect();
        let records = self.get_records(&record_keys).await?;

        let mut result = HashMap::with_capacity(keys.len());
        for (key, record) in keys.iter().zip(records) {
            result.insert(key.clone(), account_status_from_record(key, &record)?);
        }
        Ok(result)
    }

    /// Read the current value and version of the given record keys.
    ///
    /// Keys never written return a record with no value and an empty version.
    async fn get_records(&self, keys: &[ByteString]) -> StoreResult<Vec<Record>>;

    /// Commit a batch of serialized transactions atomically.
    async fn add_transactions(&self, transactions: &[ByteString]) -> StoreResult<()>;

    /// Raw serialized transactions strictly after the given transaction
    /// hash, in log order. `None` returns the full log.
    async fn transactions_since(&self, position: Option<&TxId>) -> StoreResult<Vec<ByteString>>;
}

/// Read helpers consumed by the query endpoints, not by the validation
/// pipeline.
#[async_trait]
pub trait LedgerQueries: Send + Sync {
    /// The raw transaction whose mutation hashes to `mutation_hash`.
    async fn get_transaction(&self, mutation_hash: &TxId) -> StoreResult<Option<ByteString>>;

    /// All records whose key starts with the given byte prefix.
    async fn get_key_starting_from(&self, prefix: &ByteString) -> StoreResult<Vec<Record>>;

    /// All balance slots stored under an account path.
    async fn get_account_records(&self, account: &LedgerPath) -> StoreResult<Vec<AccountStatus>>;
}

/// Checkpoint persistence for the anchor builder.
#[async_trait]
pub trait AnchorStore: Send + Sync {
    /// The most recently committed checkpoint, if any.
    async fn get_last_anchor(&self) -> StoreResult<Option<LedgerAnchor>>;

    /// Persist a checkpoint as the new baseline for the next anchor cycle.
    async fn commit_anchor(&self, anchor: &LedgerAnchor) -> StoreResult<()>;
}

/// Interpret a stored record as the state of a balance slot.
pub(crate) fn account_status_from_record(
    key: &AccountKey,
    record: &Record,
) -> StoreResult<AccountStatus> {
    match &record.value {
        None => Ok(AccountStatus::new(key.clone(), 0, record.version.clone())),
        Some(value) => {
            let balance = decode_balance(value).map_err(|_| {
                StoreError::Corrupted(format!("account record {} has a malformed balance", record.key))
            })?;
            Ok(AccountStatus::new(key.clone(), balance, record.version.clone()))
        }
    }
}
