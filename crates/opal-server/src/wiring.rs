use std::sync::Arc;

use opal_store::InMemoryLedger;
use opal_types::{ByteString, LedgerPath};
use opal_validation::{
    Access, Acl, AdminValidator, DefaultPermissionLayout, DynamicPermissionLayout,
    MutationValidator, PermissionBasedValidator, PermissionSet, PatternMatching,
    PermissionsProvider, StaticPermissionLayout, StringPattern, Subject, TransactionValidator,
    ACL_RESOURCE_NAME,
};

use crate::config::{IssuerConfig, ServerConfig, ValidatorConfig};
use crate::error::{ServerError, ServerResult};

/// Shared handler state: the storage engine and, unless the instance is an
/// observer, the submission pipeline.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<InMemoryLedger>,
    pub validator: Option<Arc<TransactionValidator>>,
}

/// Build the configured validator strategy. Runs once at process start.
pub fn build_validator(
    config: &ServerConfig,
    storage: Arc<InMemoryLedger>,
) -> ServerResult<Option<Arc<TransactionValidator>>> {
    let namespace = config.namespace_bytes()?;

    let rules: Arc<dyn MutationValidator> = match &config.validator {
        ValidatorConfig::Disabled => return Ok(None),
        ValidatorConfig::Admin { admin_keys } => {
            Arc::new(AdminValidator::new(parse_keys(admin_keys)?))
        }
        ValidatorConfig::PermissionBased {
            admin_keys,
            issuers,
            allow_third_party_assets,
        } => {
            let mut acls = Vec::new();
            if !admin_keys.is_empty() {
                acls.push(admin_acl(parse_keys(admin_keys)?));
            }
            for issuer in issuers {
                acls.extend(issuer_acls(issuer)?);
            }
            let layers: Vec<Arc<dyn PermissionsProvider>> = vec![
                Arc::new(DefaultPermissionLayout::new(*allow_third_party_assets)),
                Arc::new(StaticPermissionLayout::new(acls)),
                Arc::new(DynamicPermissionLayout::new(storage.clone())),
            ];
            Arc::new(PermissionBasedValidator::new(layers))
        }
    };

    Ok(Some(Arc::new(TransactionValidator::new(
        storage,
        rules,
        vec![namespace],
    ))))
}

fn parse_keys(keys: &[String]) -> ServerResult<Vec<ByteString>> {
    keys.iter()
        .map(|key| {
            ByteString::from_hex(key)
                .map_err(|_| ServerError::Config(format!("key is not valid hex: {key}")))
        })
        .collect()
}

fn key_subjects(keys: Vec<ByteString>) -> Vec<Subject> {
    keys.into_iter().map(Subject::single).collect()
}

/// Administrators get every right over the whole tree.
fn admin_acl(keys: Vec<ByteString>) -> Acl {
    Acl {
        subjects: key_subjects(keys),
        path: LedgerPath::root(),
        recursive: true,
        record_name: StringPattern::match_all(),
        permissions: PermissionSet::allow_all(),
    }
}

/// The static rules one issuer entry expands to.
fn issuer_acls(issuer: &IssuerConfig) -> ServerResult<Vec<Acl>> {
    let path = LedgerPath::parse(&issuer.path)
        .map_err(|_| ServerError::Config(format!("issuer path is malformed: {}", issuer.path)))?;
    if !path.is_directory() {
        return Err(ServerError::Config(format!(
            "issuer path must be a directory: {}",
            issuer.path
        )));
    }
    let keys = parse_keys(&issuer.keys)?;

    Ok(vec![
        // Issuers control their subtree: spend, issue and write data.
        Acl {
            subjects: key_subjects(keys.clone()),
            path: path.clone(),
            recursive: true,
            record_name: StringPattern::match_all(),
            permissions: PermissionSet {
                account_modify: Access::Permit,
                account_spend: Access::Permit,
                account_issuance: Access::Permit,
                data_modify: Access::Permit,
                ..PermissionSet::unset()
            },
        },
        // But never the subtree's own acl documents.
        Acl {
            subjects: key_subjects(keys.clone()),
            path: path.clone(),
            recursive: true,
            record_name: StringPattern::new(ACL_RESOURCE_NAME, PatternMatching::Exact),
            permissions: PermissionSet {
                data_modify: Access::Deny,
                ..PermissionSet::unset()
            },
        },
        // Anyone may hold a balance of the issued asset.
        Acl {
            subjects: vec![Subject::Everyone],
            path: LedgerPath::root(),
            recursive: true,
            record_name: StringPattern::new(&issuer.path, PatternMatching::Prefix),
            permissions: PermissionSet {
                account_modify: Access::Permit,
                ..PermissionSet::unset()
            },
        },
        // Issuance accounts for this asset may go negative.
        Acl {
            subjects: key_subjects(keys),
            path: LedgerPath::root(),
            recursive: true,
            record_name: StringPattern::new(&issuer.path, PatternMatching::Prefix),
            permissions: PermissionSet {
                account_negative: Access::Permit,
                ..PermissionSet::unset()
            },
        },
    ])
}
