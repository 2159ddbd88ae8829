use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use opal_crypto::SignatureEvidence;
use opal_store::{StorageEngine, StoreError};
use opal_types::{
    deserialize_mutation, serialize_transaction, AccountKey, ByteString, LedgerPath, Transaction,
    TxId, MAX_KEY_SIZE,
};

use crate::error::TransactionRejected;
use crate::parsed::ParsedMutation;
use crate::rules::MutationValidator;

/// Metadata stored with every committed transaction: the signature evidence
/// that authorized it, JSON-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    pub signatures: Vec<SignatureEvidence>,
}

/// The submission pipeline: every mutation entering the ledger goes through
/// [`Self::post_transaction`].
pub struct TransactionValidator {
    storage: Arc<dyn StorageEngine>,
    rules: Arc<dyn MutationValidator>,
    valid_namespaces: Vec<ByteString>,
}

impl TransactionValidator {
    pub fn new(
        storage: Arc<dyn StorageEngine>,
        rules: Arc<dyn MutationValidator>,
        valid_namespaces: Vec<ByteString>,
    ) -> Self {
        Self {
            storage,
            rules,
            valid_namespaces,
        }
    }

    /// Validate a submitted mutation and commit it as a transaction.
    ///
    /// Checks run in a fixed fail-fast order; a rejection at any step leaves
    /// the store untouched. Returns the id of the committed transaction, the
    /// double-SHA-256 hash of its serialized form.
    pub async fn post_transaction(
        &self,
        raw_mutation: &ByteString,
        authentication: &[SignatureEvidence],
    ) -> Result<TxId, TransactionRejected> {
        match self.validate_and_commit(raw_mutation, authentication).await {
            Ok(id) => {
                info!(transaction = %id.to_hex(), "transaction committed");
                Ok(id)
            }
            Err(rejected) => {
                warn!(reason = rejected.reason_code(), "transaction rejected");
                Err(rejected)
            }
        }
    }

    async fn validate_and_commit(
        &self,
        raw_mutation: &ByteString,
        authentication: &[SignatureEvidence],
    ) -> Result<TxId, TransactionRejected> {
        let mutation = deserialize_mutation(raw_mutation.as_bytes())
            .map_err(|_| TransactionRejected::InvalidMutation)?;
        if mutation.records.is_empty()
            || mutation.records.iter().any(|r| r.key.len() > MAX_KEY_SIZE)
        {
            return Err(TransactionRejected::InvalidMutation);
        }

        if !self.valid_namespaces.contains(&mutation.namespace) {
            return Err(TransactionRejected::InvalidNamespace);
        }

        // Signatures cover the hash of the raw mutation bytes, not the bytes
        // themselves.
        let mutation_hash = TxId::compute(raw_mutation.as_bytes());
        if authentication
            .iter()
            .any(|evidence| !evidence.verify(mutation_hash.as_bytes()))
        {
            return Err(TransactionRejected::InvalidSignature);
        }

        let parsed = ParsedMutation::parse(&mutation)?;

        let touched: Vec<AccountKey> = parsed
            .account_entries
            .iter()
            .map(|entry| entry.account_key.clone())
            .collect();
        let accounts = self.storage.get_accounts(&touched).await?;

        // Deltas accumulate in i128: a hostile set of i64 balances can wrap
        // a 64-bit sum back to zero.
        let mut totals: HashMap<&LedgerPath, i128> = HashMap::new();
        for entry in &parsed.account_entries {
            let current = accounts
                .get(&entry.account_key)
                .map(|status| status.balance)
                .unwrap_or(0);
            *totals.entry(&entry.account_key.asset).or_insert(0) +=
                i128::from(entry.balance) - i128::from(current);
        }
        if totals.values().any(|delta| *delta != 0) {
            return Err(TransactionRejected::UnbalancedTransaction);
        }

        let mut seen = HashSet::with_capacity(touched.len());
        for key in &touched {
            if !seen.insert(key) {
                return Err(TransactionRejected::DuplicateAccount);
            }
        }

        self.rules
            .validate(&parsed, authentication, &accounts)
            .await?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let metadata = TransactionMetadata {
            signatures: authentication.to_vec(),
        };
        let metadata_bytes = serde_json::to_vec(&metadata)
            .map_err(|error| TransactionRejected::Storage(StoreError::Backend(error.to_string())))?;

        let transaction = Transaction::new(
            raw_mutation.clone(),
            timestamp,
            ByteString::new(metadata_bytes),
        );
        let serialized = ByteString::new(serialize_transaction(&transaction));

        self.storage
            .add_transactions(std::slice::from_ref(&serialized))
            .await?;

        Ok(TxId::compute(serialized.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{Acl, StringPattern, Subject};
    use crate::permissions::PermissionSet;
    use crate::providers::{DefaultPermissionLayout, StaticPermissionLayout};
    use crate::rules::PermissionBasedValidator;
    use opal_crypto::SigningKey;
    use opal_store::InMemoryLedger;
    use opal_types::{encode_balance, serialize_mutation, AccountStatus, Mutation, Record};

    const NAMESPACE: &[u8] = b"test-ledger";

    fn signer() -> SigningKey {
        SigningKey::from_bytes([42u8; 32])
    }

    fn pipeline(store: Arc<InMemoryLedger>) -> TransactionValidator {
        let full_rights = Acl {
            subjects: vec![Subject::single(signer().public_key())],
            path: LedgerPath::root(),
            recursive: true,
            record_name: StringPattern::match_all(),
            permissions: PermissionSet::allow_all(),
        };
        let rules = PermissionBasedValidator::new(vec![
            Arc::new(DefaultPermissionLayout::new(false)),
            Arc::new(StaticPermissionLayout::new(vec![full_rights])),
        ]);
        TransactionValidator::new(
            store,
            Arc::new(rules),
            vec![ByteString::new(NAMESPACE.to_vec())],
        )
    }

    fn build_mutation(entries: &[(&str, &str, i64, ByteString)]) -> ByteString {
        let records = entries
            .iter()
            .map(|(account, asset, balance, version)| {
                let slot = AccountKey::parse(account, asset).unwrap();
                Record::new(
                    slot.record_key(),
                    Some(encode_balance(*balance)),
                    version.clone(),
                )
            })
            .collect();
        let mutation = Mutation::new(
            ByteString::new(NAMESPACE.to_vec()),
            records,
            ByteString::empty(),
        );
        ByteString::new(serialize_mutation(&mutation))
    }

    fn sign(raw_mutation: &ByteString) -> Vec<SignatureEvidence> {
        vec![signer().sign(TxId::compute(raw_mutation.as_bytes()).as_bytes())]
    }

    async fn status(store: &InMemoryLedger, account: &str, asset: &str) -> AccountStatus {
        let key = AccountKey::parse(account, asset).unwrap();
        let mut accounts = store.get_accounts(std::slice::from_ref(&key)).await.unwrap();
        accounts.remove(&key).unwrap()
    }

    async fn issue_gold(store: &Arc<InMemoryLedger>, validator: &TransactionValidator) {
        let raw = build_mutation(&[
            ("/asset/gold/issuer", "/asset/gold/", -100, ByteString::empty()),
            ("/account/alice", "/asset/gold/", 100, ByteString::empty()),
        ]);
        validator.post_transaction(&raw, &sign(&raw)).await.unwrap();
        assert_eq!(status(store, "/account/alice", "/asset/gold/").await.balance, 100);
    }

    #[tokio::test]
    async fn transfer_end_to_end() {
        let store = Arc::new(InMemoryLedger::new());
        let validator = pipeline(store.clone());
        issue_gold(&store, &validator).await;

        let alice = status(&store, "/account/alice", "/asset/gold/").await;
        let raw = build_mutation(&[
            ("/account/alice", "/asset/gold/", 0, alice.version),
            ("/account/bob", "/asset/gold/", 100, ByteString::empty()),
        ]);
        let id = validator.post_transaction(&raw, &sign(&raw)).await.unwrap();

        assert_eq!(status(&store, "/account/alice", "/asset/gold/").await.balance, 0);
        assert_eq!(status(&store, "/account/bob", "/asset/gold/").await.balance, 100);

        // The returned id is the hash of the serialized transaction as stored.
        let log = store.transactions_since(None).await.unwrap();
        let last = log.last().unwrap();
        assert_eq!(id, TxId::compute(last.as_bytes()));
    }

    #[tokio::test]
    async fn stale_resubmission_is_optimistic_concurrency() {
        let store = Arc::new(InMemoryLedger::new());
        let validator = pipeline(store.clone());
        issue_gold(&store, &validator).await;

        let alice = status(&store, "/account/alice", "/asset/gold/").await;
        let raw = build_mutation(&[
            ("/account/alice", "/asset/gold/", 0, alice.version),
            ("/account/bob", "/asset/gold/", 100, ByteString::empty()),
        ]);
        validator.post_transaction(&raw, &sign(&raw)).await.unwrap();

        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::OptimisticConcurrency);
        assert_eq!(status(&store, "/account/bob", "/asset/gold/").await.balance, 100);
    }

    #[tokio::test]
    async fn empty_mutation_is_invalid() {
        let validator = pipeline(Arc::new(InMemoryLedger::new()));
        let mutation = Mutation::new(
            ByteString::new(NAMESPACE.to_vec()),
            Vec::new(),
            ByteString::empty(),
        );
        let raw = ByteString::new(serialize_mutation(&mutation));
        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::InvalidMutation);
    }

    #[tokio::test]
    async fn garbage_bytes_are_invalid() {
        let validator = pipeline(Arc::new(InMemoryLedger::new()));
        let raw = ByteString::new(vec![0xff; 16]);
        let err = validator.post_transaction(&raw, &[]).await.unwrap_err();
        assert_eq!(err, TransactionRejected::InvalidMutation);
    }

    #[tokio::test]
    async fn foreign_namespace_is_rejected() {
        let validator = pipeline(Arc::new(InMemoryLedger::new()));
        let mutation = Mutation::new(
            "other".into(),
            vec![Record::new("k".into(), None, ByteString::empty())],
            ByteString::empty(),
        );
        let raw = ByteString::new(serialize_mutation(&mutation));
        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::InvalidNamespace);
    }

    #[tokio::test]
    async fn tampered_signature_is_rejected() {
        let validator = pipeline(Arc::new(InMemoryLedger::new()));
        let raw = build_mutation(&[
            ("/asset/gold/issuer", "/asset/gold/", -100, ByteString::empty()),
            ("/account/alice", "/asset/gold/", 100, ByteString::empty()),
        ]);
        let mut evidence = sign(&raw);
        evidence[0].signature = ByteString::new(vec![0u8; 64]);
        let err = validator.post_transaction(&raw, &evidence).await.unwrap_err();
        assert_eq!(err, TransactionRejected::InvalidSignature);
    }

    #[tokio::test]
    async fn unbalanced_transfer_is_rejected() {
        let store = Arc::new(InMemoryLedger::new());
        let validator = pipeline(store.clone());
        let raw = build_mutation(&[(
            "/account/alice",
            "/asset/gold/",
            100,
            ByteString::empty(),
        )]);
        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::UnbalancedTransaction);
        assert!(store.transactions_since(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overflowing_deltas_are_still_unbalanced() {
        let store = Arc::new(InMemoryLedger::new());
        let validator = pipeline(store.clone());
        // The three deltas sum to 2^64; a wrapping 64-bit accumulator would
        // read zero and let the credits through.
        let raw = build_mutation(&[
            ("/account/alice", "/asset/gold/", i64::MAX, ByteString::empty()),
            ("/account/bob", "/asset/gold/", i64::MAX, ByteString::empty()),
            ("/account/carol", "/asset/gold/", 2, ByteString::empty()),
        ]);
        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::UnbalancedTransaction);
        assert!(store.transactions_since(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_account_path_is_invalid_path() {
        let validator = pipeline(Arc::new(InMemoryLedger::new()));
        let mutation = Mutation::new(
            ByteString::new(NAMESPACE.to_vec()),
            vec![Record::new(
                ByteString::from("no-leading-slash:ACC:/asset/gold/"),
                Some(encode_balance(0)),
                ByteString::empty(),
            )],
            ByteString::empty(),
        );
        let raw = ByteString::new(serialize_mutation(&mutation));
        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::InvalidPath);
    }

    #[tokio::test]
    async fn duplicate_slot_is_rejected() {
        let validator = pipeline(Arc::new(InMemoryLedger::new()));
        // Balanced overall, but the same slot appears twice.
        let raw = build_mutation(&[
            ("/account/alice", "/asset/gold/", 50, ByteString::empty()),
            ("/account/alice", "/asset/gold/", -50, ByteString::empty()),
        ]);
        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::DuplicateAccount);
    }

    #[tokio::test]
    async fn oversized_key_is_invalid() {
        let validator = pipeline(Arc::new(InMemoryLedger::new()));
        let mutation = Mutation::new(
            ByteString::new(NAMESPACE.to_vec()),
            vec![Record::new(
                ByteString::new(vec![b'k'; MAX_KEY_SIZE + 1]),
                None,
                ByteString::empty(),
            )],
            ByteString::empty(),
        );
        let raw = ByteString::new(serialize_mutation(&mutation));
        let err = validator.post_transaction(&raw, &sign(&raw)).await.unwrap_err();
        assert_eq!(err, TransactionRejected::InvalidMutation);
    }

    #[tokio::test]
    async fn committed_metadata_carries_signatures() {
        let store = Arc::new(InMemoryLedger::new());
        let validator = pipeline(store.clone());
        issue_gold(&store, &validator).await;

        let log = store.transactions_since(None).await.unwrap();
        let transaction = opal_types::deserialize_transaction(log[0].as_bytes()).unwrap();
        let metadata: TransactionMetadata =
            serde_json::from_slice(transaction.metadata.as_bytes()).unwrap();
        assert_eq!(metadata.signatures.len(), 1);
        assert_eq!(metadata.signatures[0].public_key, signer().public_key());
    }
}
