use std::io;

use rusqlite;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
    #[error("friending quota for {0} not found")]
    QuotaNotFound(String),
    #[error("friending quota for {0} already exists")]
    QuotaExists(String),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error("database connection poisoned")]
    ConnectionPoisoned,
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
}

