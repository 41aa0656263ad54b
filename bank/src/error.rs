//! Bank error types

use rscoin_core::MintetteId;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BankError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("Result count does not match the mintette roster")]
    InconsistentResponse,

    #[error("Unknown mintette: {0}")]
    UnknownMintette(String),

    #[error("Unknown explorer: {0}")]
    UnknownExplorer(String),

    #[error("Bad period result from mintette {0}")]
    BadPeriodResult(MintetteId),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rscoin_storage::StorageError> for BankError {
    fn from(err: rscoin_storage::StorageError) -> Self {
        BankError::Storage(err.to_string())
    }
}
