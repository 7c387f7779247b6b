use serde::{Deserialize, Serialize};

use crate::quota::FriendingQuota;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateQuotaRequest {
    pub email: String,
    pub max_allowed: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaResponse {
    pub quota: FriendingQuota,
    pub remaining: i64,
}

impl From<FriendingQuota> for QuotaResponse {
    fn from(quota: FriendingQuota) -> Self {
        Self {
            remaining: quota.remaining_quota(),
            quota,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckQuotaRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckQuotaResponse {
    pub granted: bool,
    pub remaining: i64,
    pub quota: FriendingQuota,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemainingQuotaResponse {
    pub email: String,
    pub remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetMaxAllowedRequest {
    pub max_allowed: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverrideTotalFriendedRequest {
    pub total_friended: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub details: Option<serde_json::Value>,
}
