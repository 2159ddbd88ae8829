use opal_store::StoreError;
use thiserror::Error;

/// A rejected submission.
///
/// Every variant except `Storage` carries a stable reason code surfaced to
/// clients via [`Self::reason_code`]; the code strings are part of the API
/// contract and never change. Rejection is total: no storage write has
/// happened by the time one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionRejected {
    #[error("the mutation could not be parsed")]
    InvalidMutation,

    #[error("the mutation namespace is not accepted by this ledger")]
    InvalidNamespace,

    #[error("a signature failed verification")]
    InvalidSignature,

    #[error("a record key does not follow the account/data taxonomy")]
    NotAccountMutation,

    #[error("an account record is malformed")]
    InvalidAccount,

    #[error("asset balance deltas do not sum to zero")]
    UnbalancedTransaction,

    #[error("the same account key appears more than once")]
    DuplicateAccount,

    #[error("an account or asset path is invalid")]
    InvalidPath,

    #[error("the account cannot be created")]
    AccountCannotBeCreated,

    #[error("the account cannot receive funds")]
    AccountCannotReceive,

    #[error("spending from this account is not permitted")]
    CannotSpendFromAccount,

    #[error("issuing this asset is not permitted")]
    CannotIssueAsset,

    #[error("modifying this account is not permitted")]
    AccountModificationUnauthorized,

    #[error("modifying this data record is not permitted")]
    CannotModifyData,

    #[error("the account balance cannot go negative")]
    NegativeBalance,

    #[error("no authorized signature is present")]
    SignatureMissing,

    #[error("a version token was stale; re-read and resubmit")]
    OptimisticConcurrency,

    #[error("storage failure: {0}")]
    Storage(StoreError),
}

impl TransactionRejected {
    /// The stable string reason code reported to clients.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::InvalidMutation => "InvalidMutation",
            Self::InvalidNamespace => "InvalidNamespace",
            Self::InvalidSignature => "InvalidSignature",
            Self::NotAccountMutation => "NotAccountMutation",
            Self::InvalidAccount => "InvalidAccount",
            Self::UnbalancedTransaction => "UnbalancedTransaction",
            Self::DuplicateAccount => "DuplicateAccount",
            Self::InvalidPath => "InvalidPath",
            Self::AccountCannotBeCreated => "AccountCannotBeCreated",
            Self::AccountCannotReceive => "AccountCannotReceive",
            Self::CannotSpendFromAccount => "CannotSpendFromAccount",
            Self::CannotIssueAsset => "CannotIssueAsset",
            Self::AccountModificationUnauthorized => "AccountModificationUnauthorized",
            Self::CannotModifyData => "CannotModifyData",
            Self::NegativeBalance => "NegativeBalance",
            Self::SignatureMissing => "SignatureMissing",
            Self::OptimisticConcurrency => "OptimisticConcurrency",
            Self::Storage(_) => "InternalError",
        }
    }
}

impl From<StoreError> for TransactionRejected {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ConcurrentMutation { .. } => Self::OptimisticConcurrency,
            other => Self::Storage(other),
        }
    }
}
