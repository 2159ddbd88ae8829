use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use opal_crypto::SignatureEvidence;
use opal_types::{AccountKey, AccountStatus, ByteString};

use crate::error::TransactionRejected;
use crate::parsed::ParsedMutation;
use crate::providers::{resolve_permissions, PermissionsProvider};

/// The pluggable rules stage of the submission pipeline.
///
/// Called after structural checks, signature verification and the balance
/// fetch; `accounts` holds the current status of every touched slot. Exactly
/// one implementation is active per deployment.
#[async_trait]
pub trait MutationValidator: Send + Sync {
    async fn validate(
        &self,
        mutation: &ParsedMutation,
        authentication: &[SignatureEvidence],
        accounts: &HashMap<AccountKey, AccountStatus>,
    ) -> Result<(), TransactionRejected>;
}

/// Rules driven by the layered permission resolver.
pub struct PermissionBasedValidator {
    layers: Vec<Arc<dyn PermissionsProvider>>,
}

impl PermissionBasedValidator {
    pub fn new(layers: Vec<Arc<dyn PermissionsProvider>>) -> Self {
        Self { layers }
    }
}

#[async_trait]
impl MutationValidator for PermissionBasedValidator {
    async fn validate(
        &self,
        mutation: &ParsedMutation,
        authentication: &[SignatureEvidence],
        accounts: &HashMap<AccountKey, AccountStatus>,
    ) -> Result<(), TransactionRejected> {
        if authentication.is_empty() {
            return Err(TransactionRejected::SignatureMissing);
        }
        // Signatures were verified upstream; here they are identities only.
        let identities: Vec<ByteString> = authentication
            .iter()
            .map(|evidence| evidence.public_key.clone())
            .collect();

        for proposed in &mutation.account_entries {
            let slot = &proposed.account_key;
            let current = accounts
                .get(slot)
                .cloned()
                .unwrap_or_else(|| AccountStatus::missing(slot.clone()));

            let account_rights = resolve_permissions(
                &self.layers,
                &identities,
                &slot.account,
                false,
                &slot.asset.full_path(),
            )
            .await?;
            let asset_rights =
                resolve_permissions(&self.layers, &identities, &slot.asset, true, "").await?;

            if !account_rights.account_modify.is_permit() {
                return Err(TransactionRejected::AccountModificationUnauthorized);
            }

            if slot.account.is_directory() {
                // Directory paths are containers, never balance holders.
                if current.version.is_empty() {
                    return Err(TransactionRejected::AccountCannotBeCreated);
                }
                if proposed.balance > current.balance {
                    return Err(TransactionRejected::AccountCannotReceive);
                }
            }

            // Issuance rights over the asset subtree cover any decrease,
            // including into negative territory.
            if proposed.balance < current.balance && !asset_rights.account_issuance.is_permit() {
                if proposed.balance >= 0 {
                    if !account_rights.account_spend.is_permit() {
                        return Err(TransactionRejected::CannotSpendFromAccount);
                    }
                } else if !account_rights.account_negative.is_permit() {
                    // Spending non-existent funds: inside the asset subtree
                    // this is failed issuance, elsewhere plain overdraft.
                    return Err(if slot.asset.is_prefix_of(&slot.account) {
                        TransactionRejected::CannotIssueAsset
                    } else {
                        TransactionRejected::NegativeBalance
                    });
                }
            }
        }

        for (key, _record) in &mutation.data_records {
            let rights =
                resolve_permissions(&self.layers, &identities, &key.path, false, &key.name)
                    .await?;
            if !rights.data_modify.is_permit() {
                return Err(TransactionRejected::CannotModifyData);
            }
        }

        Ok(())
    }
}

/// Open-loop rules: any mutation goes through as long as one signature comes
/// from a configured administrator key.
pub struct AdminValidator {
    admin_keys: Vec<ByteString>,
}

impl AdminValidator {
    pub fn new(admin_keys: Vec<ByteString>) -> Self {
        Self { admin_keys }
    }
}

#[async_trait]
impl MutationValidator for AdminValidator {
    async fn validate(
        &self,
        _mutation: &ParsedMutation,
        authentication: &[SignatureEvidence],
        _accounts: &HashMap<AccountKey, AccountStatus>,
    ) -> Result<(), TransactionRejected> {
        let authorized = authentication
            .iter()
            .any(|evidence| self.admin_keys.contains(&evidence.public_key));
        if authorized {
            Ok(())
        } else {
            Err(TransactionRejected::SignatureMissing)
        }
    }
}
