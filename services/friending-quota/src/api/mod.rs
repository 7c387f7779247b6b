use std::sync::Arc;

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::*;
pub use router::create_router;
pub use types::*;

use crate::config::FriendingQuotaConfig;
use crate::quota::FriendingQuotaManager;

pub struct ApiState {
    pub quota_manager: Arc<FriendingQuotaManager>,
    pub config: Arc<FriendingQuotaConfig>,
}

impl ApiState {
    pub fn new(quota_manager: Arc<FriendingQuotaManager>, config: FriendingQuotaConfig) -> Self {
        Self {
            quota_manager,
            config: Arc::new(config),
        }
    }
}
