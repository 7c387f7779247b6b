pub mod api;
pub mod config;
pub mod quota;
pub mod storage;

pub use api::{create_router, ApiState};
pub use config::FriendingQuotaConfig;
pub use quota::{
    FriendingDecision, FriendingQuota, FriendingQuotaManager, QuotaError, UnlimitedIdentifiers,
};
pub use storage::{QuotaDatabase, StorageError};
