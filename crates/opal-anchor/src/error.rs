use opal_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnchorError {
    #[error("storage failure: {0}")]
    Store(#[from] StoreError),

    #[error("anchor recorder failure: {0}")]
    Recorder(String),
}

pub type AnchorResult<T> = Result<T, AnchorError>;
