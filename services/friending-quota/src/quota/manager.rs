use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::FriendingQuotaConfig;
use crate::storage::{QuotaDatabase, StorageError};

use super::error::QuotaError;
use super::record::{normalize_email, FriendingQuota};
use super::unlimited::UnlimitedIdentifiers;

/// Outcome of a guarded increment. `granted == false` means the friending
/// operation must not proceed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendingDecision {
    pub granted: bool,
    pub quota: FriendingQuota,
}

impl FriendingDecision {
    pub fn remaining(&self) -> i64 {
        self.quota.remaining_quota()
    }
}

/// Serves friending quotas backed by [`QuotaDatabase`].
///
/// Reads always go to the database, so several processes sharing one data
/// directory agree on usage. The cache holds the last record this process
/// saw per email; mutations run while that email's cache entry is held, so
/// same-key callers in this process are serialized, and the immediate SQLite
/// transaction covers other processes.
#[derive(Clone)]
pub struct FriendingQuotaManager {
    cache: Arc<DashMap<String, FriendingQuota>>,
    database: Arc<QuotaDatabase>,
    unlimited: Arc<UnlimitedIdentifiers>,
    default_max_allowed: i64,
}

impl FriendingQuotaManager {
    pub fn new(database: Arc<QuotaDatabase>, config: &FriendingQuotaConfig) -> Self {
        Self {
            cache: Arc::new(DashMap::new()),
            database,
            unlimited: Arc::new(config.unlimited_emails.clone()),
            default_max_allowed: config.default_max_allowed,
        }
    }

    pub fn load_from_database(&self) -> Result<usize, StorageError> {
        let quotas = self.database.list_quotas()?;
        let loaded = quotas.len();

        for quota in quotas {
            self.cache.insert(quota.email().to_string(), quota);
        }

        Ok(loaded)
    }

    /// Creates a new record with `total_friended = 0`. Fails if the email is
    /// already tracked.
    pub fn create_quota(
        &self,
        email: &str,
        max_allowed: Option<i64>,
    ) -> Result<FriendingQuota, QuotaError> {
        let quota = FriendingQuota::new(email, max_allowed.unwrap_or(self.default_max_allowed))?;
        let quota = self.database.create_quota(&quota)?;
        self.cache.insert(quota.email().to_string(), quota.clone());

        info!(
            email = quota.email(),
            max_allowed = quota.max_allowed(),
            "created friending quota"
        );
        Ok(quota)
    }

    /// Returns the record for `email`, creating it with `max_allowed` (or the
    /// configured default) when missing.
    pub fn ensure_quota(
        &self,
        email: &str,
        max_allowed: Option<i64>,
    ) -> Result<FriendingQuota, QuotaError> {
        let email = normalize_email(email.to_string())?;
        let initial = FriendingQuota::new(
            email.clone(),
            max_allowed.unwrap_or(self.default_max_allowed),
        )?;
        let quota = self.database.get_or_create_quota(&initial)?;
        self.cache.insert(email, quota.clone());

        debug!(
            email = quota.email(),
            max_allowed = quota.max_allowed(),
            total_friended = quota.total_friended(),
            "ensured friending quota"
        );
        Ok(quota)
    }

    pub fn get_quota(&self, email: &str) -> Result<Option<FriendingQuota>, QuotaError> {
        let email = normalize_email(email.to_string())?;
        let stored = self.database.get_quota(&email)?;

        match &stored {
            Some(quota) => {
                self.cache.insert(email, quota.clone());
            }
            None => {
                self.cache.remove(&email);
            }
        }
        Ok(stored)
    }

    pub fn list_quotas(&self) -> Result<Vec<FriendingQuota>, QuotaError> {
        Ok(self.database.list_quotas()?)
    }

    pub fn remaining_quota(&self, email: &str) -> Result<i64, QuotaError> {
        let email = normalize_email(email.to_string())?;
        self.get_quota(&email)?
            .map(|quota| quota.remaining_quota())
            .ok_or(QuotaError::QuotaNotFound(email))
    }

    /// Consumes one unit of the user's friending quota if any is left.
    ///
    /// Untracked emails get a record with the default ceiling first.
    pub fn check_and_increment(&self, email: &str) -> Result<FriendingDecision, QuotaError> {
        let email = self.ensure_quota(email, None)?.email().to_string();
        let (quota, granted) = self.mutate(&email, |quota| {
            quota.check_and_increment_total_friended(&self.unlimited)
        })?;

        if granted {
            debug!(
                email = %email,
                total_friended = quota.total_friended(),
                remaining = quota.remaining_quota(),
                "friending quota consumed"
            );
        } else {
            info!(
                email = %email,
                max_allowed = quota.max_allowed(),
                total_friended = quota.total_friended(),
                "friending quota exhausted"
            );
        }

        Ok(FriendingDecision { granted, quota })
    }

    /// Changes the ceiling for a tracked email. Lowering it below current
    /// usage is allowed and leaves the remaining quota negative.
    pub fn set_max_allowed(
        &self,
        email: &str,
        max_allowed: i64,
    ) -> Result<FriendingQuota, QuotaError> {
        let email = normalize_email(email.to_string())?;
        let (quota, result) = self.mutate(&email, |quota| quota.set_max_allowed(max_allowed))?;
        result?;

        info!(email = %email, max_allowed, "updated friending quota ceiling");
        warn_if_overdrawn(&quota);
        Ok(quota)
    }

    /// Overrides the usage counter for a tracked email.
    pub fn override_total_friended(
        &self,
        email: &str,
        total_friended: i64,
    ) -> Result<FriendingQuota, QuotaError> {
        let email = normalize_email(email.to_string())?;
        let (quota, result) =
            self.mutate(&email, |quota| quota.override_total_friended(total_friended))?;
        result?;

        info!(email = %email, total_friended, "overrode friending quota usage");
        warn_if_overdrawn(&quota);
        Ok(quota)
    }

    fn mutate<F, T>(&self, email: &str, update: F) -> Result<(FriendingQuota, T), QuotaError>
    where
        F: FnOnce(&mut FriendingQuota) -> T,
    {
        let mut entry = self
            .cache
            .entry(email.to_string())
            .or_try_insert_with(|| {
                self.database
                    .get_quota(email)?
                    .ok_or_else(|| StorageError::QuotaNotFound(email.to_string()))
            })?;

        let (quota, output) = self.database.update_quota(email, update)?;
        *entry = quota.clone();

        Ok((quota, output))
    }
}

fn warn_if_overdrawn(quota: &FriendingQuota) {
    if quota.remaining_quota() < 0 {
        warn!(
            email = quota.email(),
            max_allowed = quota.max_allowed(),
            total_friended = quota.total_friended(),
            remaining = quota.remaining_quota(),
            "friending quota usage exceeds ceiling"
        );
    }
}
