pub mod database;
pub mod error;
pub mod schema;

pub use database::QuotaDatabase;
pub use error::StorageError;

pub const QUOTA_DB_FILENAME: &str = "friending_quotas.db";
