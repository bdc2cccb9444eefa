use thiserror::Error;

use insti_auth::AuthzError;
use insti_core::DomainError;

use crate::storage::StoreError;

/// Failure of a ledger store operation.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A stored collection did not decode (or encode) as JSON.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),
}

impl LedgerError {
    /// Another writer changed the backing store between load and save.
    pub fn is_conflict(&self) -> bool {
        matches!(self, LedgerError::Store(e) if e.is_conflict())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
