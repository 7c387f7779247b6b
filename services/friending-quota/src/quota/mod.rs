pub mod error;
pub mod manager;
pub mod record;
pub mod unlimited;

pub use error::QuotaError;
pub use manager::{FriendingDecision, FriendingQuotaManager};
pub use record::FriendingQuota;
pub use unlimited::{UnlimitedIdentifiers, LEGACY_UNLIMITED_EMAILS};
