use std::sync::Arc;

use async_trait::async_trait;

use opal_store::{StorageEngine, StoreResult};
use opal_types::{ByteString, LedgerPath, RecordKey};

use crate::acl::{Acl, StoredAcl, ACL_RESOURCE_NAME};
use crate::permissions::{Access, PermissionSet};

/// One layer of the permission resolution stack.
///
/// A provider answers a single question: what does this layer say about
/// `identities` acting on `path` / `record_name`? `recursive_only` is set
/// when the caller needs blanket rights over a directory rather than rights
/// on one specific leaf.
#[async_trait]
pub trait PermissionsProvider: Send + Sync {
    async fn get_permissions(
        &self,
        identities: &[ByteString],
        path: &LedgerPath,
        recursive_only: bool,
        record_name: &str,
    ) -> StoreResult<PermissionSet>;
}

/// Resolve a permission query across layers.
///
/// Layers are scanned in the given order; within a layer deny overrides
/// permit, and the first layer deciding a right wins that right. A right
/// still Unset after all layers is treated as Deny by callers
/// ([`Access::is_permit`] returns `false` for Unset).
pub async fn resolve_permissions(
    layers: &[Arc<dyn PermissionsProvider>],
    identities: &[ByteString],
    path: &LedgerPath,
    recursive_only: bool,
    record_name: &str,
) -> StoreResult<PermissionSet> {
    let mut resolved = PermissionSet::unset();
    for layer in layers {
        let level = layer
            .get_permissions(identities, path, recursive_only, record_name)
            .await?;
        resolved = resolved.add_levels(&level);
    }
    Ok(resolved)
}

// ---------------------------------------------------------------------------
// Implicit layer
// ---------------------------------------------------------------------------

/// Permissions derived purely from path shape, with no configured rules.
///
/// - Everyone may modify balances; receiving needs no grant.
/// - A signer whose public key hex is the third segment of
///   `/account/p2pkh/<hex>/...` may spend from and write data under that
///   subtree.
/// - With third-party assets enabled, the same applies to issuance under
///   `/asset/p2pkh/<hex>/...`.
pub struct DefaultPermissionLayout {
    allow_third_party_assets: bool,
}

impl DefaultPermissionLayout {
    pub fn new(allow_third_party_assets: bool) -> Self {
        Self {
            allow_third_party_assets,
        }
    }
}

#[async_trait]
impl PermissionsProvider for DefaultPermissionLayout {
    async fn get_permissions(
        &self,
        identities: &[ByteString],
        path: &LedgerPath,
        _recursive_only: bool,
        _record_name: &str,
    ) -> StoreResult<PermissionSet> {
        let mut result = PermissionSet {
            account_modify: Access::Permit,
            ..PermissionSet::unset()
        };

        let segments = path.segments();
        if segments.len() >= 3 && segments[1] == "p2pkh" {
            let owned = identities.iter().any(|id| id.to_hex() == segments[2]);
            if owned {
                match segments[0].as_str() {
                    "account" => {
                        result.account_spend = Access::Permit;
                        result.data_modify = Access::Permit;
                    }
                    "asset" if self.allow_third_party_assets => {
                        result.account_issuance = Access::Permit;
                        result.data_modify = Access::Permit;
                    }
                    _ => {}
                }
            }
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Static layer
// ---------------------------------------------------------------------------

/// A fixed ACL list from deployment configuration (administrator and issuer
/// rules).
pub struct StaticPermissionLayout {
    acls: Vec<Acl>,
}

impl StaticPermissionLayout {
    pub fn new(acls: Vec<Acl>) -> Self {
        Self { acls }
    }
}

#[async_trait]
impl PermissionsProvider for StaticPermissionLayout {
    async fn get_permissions(
        &self,
        identities: &[ByteString],
        path: &LedgerPath,
        recursive_only: bool,
        record_name: &str,
    ) -> StoreResult<PermissionSet> {
        let mut result = PermissionSet::unset();
        for acl in &self.acls {
            if acl.is_match(identities, path, recursive_only, record_name) {
                result = result.intersect_with(&acl.permissions);
            }
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Dynamic layer
// ---------------------------------------------------------------------------

/// ACL rules stored in the ledger itself, as the JSON `acl` data record of
/// each directory from the root down to the query path.
///
/// Writable at runtime by anyone holding DataModify on the `acl` resource
/// name. The read capability is injected so the resolver stays testable
/// against fixture stores.
pub struct DynamicPermissionLayout {
    storage: Arc<dyn StorageEngine>,
}

impl DynamicPermissionLayout {
    pub fn new(storage: Arc<dyn StorageEngine>) -> Self {
        Self { storage }
    }

    /// The query path's enclosing directories, outermost first.
    fn candidate_directories(path: &LedgerPath) -> Vec<LedgerPath> {
        let segments = path.segments();
        let mut directories = Vec::with_capacity(segments.len() + 1);
        directories.push(LedgerPath::root());
        for depth in 1..=segments.len() {
            let parts: Vec<&str> = segments[..depth].iter().map(String::as_str).collect();
            if let Ok(directory) = LedgerPath::from_segments(&parts, true) {
                directories.push(directory);
            }
        }
        directories
    }
}

#[async_trait]
impl PermissionsProvider for DynamicPermissionLayout {
    async fn get_permissions(
        &self,
        identities: &[ByteString],
        path: &LedgerPath,
        recursive_only: bool,
        record_name: &str,
    ) -> StoreResult<PermissionSet> {
        let directories = Self::candidate_directories(path);
        let keys: Vec<ByteString> = directories
            .iter()
            .map(|dir| RecordKey::data(dir, ACL_RESOURCE_NAME).to_byte_string())
            .collect();
        let records = self.storage.get_records(&keys).await?;

        let mut result = PermissionSet::unset();
        for (directory, record) in directories.into_iter().zip(records) {
            let Some(value) = record.value else { continue };
            if value.is_empty() {
                continue;
            }
            match serde_json::from_slice::<Vec<StoredAcl>>(value.as_bytes()) {
                Ok(stored) => {
                    for rule in stored {
                        let acl = rule.at_path(directory.clone());
                        if acl.is_match(identities, path, recursive_only, record_name) {
                            result = result.intersect_with(&acl.permissions);
                        }
                    }
                }
                Err(error) => {
                    // A bad document must not lock up the ledger; it simply
                    // grants nothing.
                    tracing::warn!(path = %directory, %error, "ignoring malformed acl record");
                }
            }
        }
        Ok(result)
    }
}
