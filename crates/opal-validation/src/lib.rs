//! Transaction validation for the Opal ledger.
//!
//! The entry point is [`TransactionValidator::post_transaction`], which runs
//! every submitted mutation through a fixed fail-fast sequence of structural,
//! cryptographic and balance checks before handing it to the deployment's
//! rules strategy and committing it to storage.
//!
//! Authorization is resolved through layered ACLs: an implicit layer derived
//! from path shape, a static layer from configuration and a dynamic layer
//! stored in the ledger itself. See [`providers`] for the resolution rules.

pub mod acl;
pub mod error;
pub mod parsed;
pub mod permissions;
pub mod pipeline;
pub mod providers;
pub mod rules;

pub use acl::{Acl, PatternMatching, StoredAcl, StringPattern, Subject, ACL_RESOURCE_NAME};
pub use error::TransactionRejected;
pub use parsed::ParsedMutation;
pub use permissions::{Access, PermissionSet};
pub use pipeline::{TransactionMetadata, TransactionValidator};
pub use providers::{
    resolve_permissions, DefaultPermissionLayout, DynamicPermissionLayout, PermissionsProvider,
    StaticPermissionLayout,
};
pub use rules::{AdminValidator, MutationValidator, PermissionBasedValidator};
