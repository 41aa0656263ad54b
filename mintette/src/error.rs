//! Mintette error types

use rscoin_core::transaction::TransactionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MintetteError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MintetteError {
    #[error("Addr id is not an input of the transaction")]
    InvalidTxInput,

    #[error("Addr id is not among this mintette's unspent outputs")]
    NotUnspent,

    #[error("Addr id already tentatively spent this period")]
    DoubleSpend,

    #[error("Transaction violates value conservation: {0}")]
    InvalidSum(TransactionError),

    #[error("Signatures do not satisfy the owner's spend strategy")]
    UnauthorizedSpend,

    #[error("Bad signature")]
    BadSignature,

    #[error("Not all owners confirmed the transaction")]
    NotAllOwnersConfirmed,

    #[error("Commit without a prior check for one of the inputs")]
    CommitWithoutCheck,

    #[error("Wrong period: expected {expected}, got {got}")]
    WrongPeriod { expected: u64, got: u64 },

    #[error("Operation not valid in the {0} state")]
    NotActive(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<rscoin_storage::StorageError> for MintetteError {
    fn from(err: rscoin_storage::StorageError) -> Self {
        MintetteError::Storage(err.to_string())
    }
}

impl From<rscoin_crypto::CryptoError> for MintetteError {
    fn from(err: rscoin_crypto::CryptoError) -> Self {
        match err {
            rscoin_crypto::CryptoError::BadSignature => MintetteError::BadSignature,
            other => MintetteError::Internal(other.to_string()),
        }
    }
}
