use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("no friending quota tracked for {0}")]
    QuotaNotFound(String),
    #[error("friending quota already exists for {0}")]
    QuotaExists(String),
    #[error("invalid email: {0:?}")]
    InvalidEmail(String),
    #[error("invalid quota value: {0}")]
    InvalidQuotaValue(String),
    #[error("storage error: {0}")]
    StorageError(StorageError),
}

impl From<StorageError> for QuotaError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::QuotaNotFound(email) => QuotaError::QuotaNotFound(email),
            StorageError::QuotaExists(email) => QuotaError::QuotaExists(email),
            other => QuotaError::StorageError(other),
        }
    }
}
