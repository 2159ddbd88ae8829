use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Mutex;

use async_trait::async_trait;

use opal_types::{
    deserialize_mutation, deserialize_transaction, AccountKey, AccountStatus, ByteString,
    LedgerAnchor, LedgerPath, Record, RecordKey, TxId,
};

use crate::error::{StoreError, StoreResult};
use crate::traits::{account_status_from_record, AnchorStore, LedgerQueries, StorageEngine};

/// In-memory, map-based ledger engine.
///
/// Intended for tests and embedding. The whole state sits behind one
/// `Mutex`; `add_transactions` stages every record write, checks every
/// version token against committed state, and only then applies, so a
/// rejected batch leaves the store byte-identical and overlapping
/// concurrent batches serialize with exactly one winner.
pub struct InMemoryLedger {
    inner: Mutex<Inner>,
}

#[derive(Clone)]
struct StoredRecord {
    value: Option<ByteString>,
    version: ByteString,
}

struct LogEntry {
    tx_hash: TxId,
    mutation_hash: TxId,
    raw: ByteString,
}

#[derive(Default)]
struct Inner {
    records: BTreeMap<ByteString, StoredRecord>,
    log: Vec<LogEntry>,
    anchors: Vec<LedgerAnchor>,
}

impl InMemoryLedger {
    /// Create a new empty ledger.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> usize {
        self.inner.lock().expect("lock poisoned").log.len()
    }

    /// Number of distinct record keys ever written.
    pub fn record_count(&self) -> usize {
        self.inner.lock().expect("lock poisoned").records.len()
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("transactions", &self.transaction_count())
            .field("records", &self.record_count())
            .finish()
    }
}

#[async_trait]
impl StorageEngine for InMemoryLedger {
    async fn get_records(&self, keys: &[ByteString]) -> StoreResult<Vec<Record>> {
        let inner = self.inner.lock().expect("lock poisoned");
        Ok(keys
            .iter()
            .map(|key| match inner.records.get(key) {
                Some(stored) => Record::new(key.clone(), stored.value.clone(), stored.version.clone()),
                None => Record::new(key.clone(), None, ByteString::empty()),
            })
            .collect())
    }

    async fn add_transactions(&self, transactions: &[ByteString]) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("lock poisoned");

        // Stage every write; nothing touches committed state until every
        // version token in the batch has checked out.
        let mut staged: BTreeMap<ByteString, StoredRecord> = BTreeMap::new();
        let mut entries = Vec::with_capacity(transactions.len());

        for raw in transactions {
            let transaction = deserialize_transaction(raw.as_bytes())?;
            let mutation = deserialize_mutation(transaction.mutation.as_bytes())?;
            let tx_hash = TxId::compute(raw.as_bytes());

            for record in &mutation.records {
                let current = staged
                    .get(&record.key)
                    .or_else(|| inner.records.get(&record.key))
                    .map(|stored| stored.version.clone())
                    .unwrap_or_else(ByteString::empty);

                if record.version != current {
                    return Err(StoreError::ConcurrentMutation {
                        key: record.key.clone(),
                    });
                }

                staged.insert(
                    record.key.clone(),
                    StoredRecord {
                        value: record.value.clone(),
                        version: tx_hash.to_byte_string(),
                    },
                );
            }

            entries.push(LogEntry {
                tx_hash,
                mutation_hash: TxId::compute(transaction.mutation.as_bytes()),
                raw: raw.clone(),
            });
        }

        for (key, stored) in staged {
            inner.records.insert(key, stored);
        }
        inner.log.extend(entries);
        Ok(())
    }

    async fn transactions_since(&self, position: Option<&TxId>) -> StoreResult<Vec<ByteString>> {
        let inner = self.inner.lock().expect("lock poisoned");
        let start = match position {
            None => 0,
            Some(position) => {
                let index = inner
                    .log
                    .iter()
                    .position(|entry| entry.tx_hash == *position)
                    .ok_or_else(|| {
                        StoreError::Corrupted(format!("unknown log position {position}"))
                    })?;
                index + 1
            }
        };
        Ok(inner.log[start..].iter().map(|entry| entry.raw.clone()).collect())
    }
}

#[async_trait]
impl LedgerQueries for InMemoryLedger {
    async fn get_transaction(&self, mutation_hash: &TxId) -> StoreResult<Option<ByteString>> {
        let inner = self.inner.lock().expect("lock poisoned");
        Ok(inner
            .log
            .iter()
            .find(|entry| entry.mutation_hash == *mutation_hash)
            .map(|entry| entry.raw.clone()))
    }

    async fn get_key_starting_from(&self, prefix: &ByteString) -> StoreResult<Vec<Record>> {
        let inner = self.inner.lock().expect("lock poisoned");
        let upper = prefix_upper_bound(prefix);
        let range = (
            Bound::Included(prefix.clone()),
            match upper {
                Some(upper) => Bound::Excluded(upper),
                None => Bound::Unbounded,
            },
        );
        Ok(inner
            .records
            .range(range)
            .map(|(key, stored)| Record::new(key.clone(), stored.value.clone(), stored.version.clone()))
            .collect())
    }

    async fn get_account_records(&self, account: &LedgerPath) -> StoreResult<Vec<AccountStatus>> {
        let prefix = ByteString::from(format!("{}:ACC:", account.full_path()).as_str());
        let records = self.get_key_starting_from(&prefix).await?;

        let mut statuses = Vec::with_capacity(records.len());
        for record in records {
            let key = RecordKey::parse(&record.key)
                .map_err(|_| StoreError::Corrupted(format!("unparsable account key {}", record.key)))?;
            let asset = LedgerPath::parse(&key.name)
                .map_err(|_| StoreError::Corrupted(format!("unparsable asset path {}", key.name)))?;
            let account_key = AccountKey::new(key.path, asset);
            statuses.push(account_status_from_record(&account_key, &record)?);
        }
        Ok(statuses)
    }
}

#[async_trait]
impl AnchorStore for InMemoryLedger {
    async fn get_last_anchor(&self) -> StoreResult<Option<LedgerAnchor>> {
        let inner = self.inner.lock().expect("lock poisoned");
        Ok(inner.anchors.last().cloned())
    }

    async fn commit_anchor(&self, anchor: &LedgerAnchor) -> StoreResult<()> {
        let mut inner = self.inner.lock().expect("lock poisoned");
        inner.anchors.push(anchor.clone());
        Ok(())
    }
}

/// Smallest byte string strictly greater than every string with the given
/// prefix, or `None` when no such bound exists (all-0xff prefixes).
fn prefix_upper_bound(prefix: &ByteString) -> Option<ByteString> {
    let mut bytes = prefix.as_bytes().to_vec();
    while let Some(last) = bytes.last() {
        if *last < 0xff {
            *bytes.last_mut().expect("non-empty") += 1;
            return Some(ByteString::new(bytes));
        }
        bytes.pop();
    }
    None
}
