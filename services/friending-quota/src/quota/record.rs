use serde::{Deserialize, Serialize};

use super::error::QuotaError;
use super::unlimited::UnlimitedIdentifiers;

/// Tracks how many friending operations a user has consumed versus how many
/// they are allowed.
///
/// The record is keyed by `email`, which is also the partition key shared by
/// the user's friend-edge records. Those live apart from the user's account
/// data so that friending does not contend with profile updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendingQuota {
    email: String,
    /// Adding a friend consumes quota. Unfriending does not give it back.
    max_allowed: i64,
    /// Includes past friends that are no longer friends.
    total_friended: i64,
}

impl FriendingQuota {
    pub fn new(email: impl Into<String>, max_allowed: i64) -> Result<Self, QuotaError> {
        let email = normalize_email(email.into())?;
        ensure_non_negative("max_allowed", max_allowed)?;

        Ok(Self {
            email,
            max_allowed,
            total_friended: 0,
        })
    }

    /// Rebuilds a record from persisted values without re-validating them.
    pub(crate) fn from_parts(email: String, max_allowed: i64, total_friended: i64) -> Self {
        Self {
            email,
            max_allowed,
            total_friended,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn max_allowed(&self) -> i64 {
        self.max_allowed
    }

    pub fn total_friended(&self) -> i64 {
        self.total_friended
    }

    /// Consumes one unit of quota if any is left.
    ///
    /// Returns `false` without touching the record once the quota is
    /// exhausted; callers must not proceed with the friending operation in
    /// that case. Emails in `unlimited` always succeed and are never charged.
    pub fn check_and_increment_total_friended(&mut self, unlimited: &UnlimitedIdentifiers) -> bool {
        if unlimited.contains(&self.email) {
            return true;
        }

        if self.is_exhausted() {
            return false;
        }

        self.total_friended += 1;
        true
    }

    /// Not clamped: negative when `max_allowed` was lowered below usage.
    pub fn remaining_quota(&self) -> i64 {
        self.max_allowed - self.total_friended
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining_quota() <= 0
    }

    /// Changes the ceiling. Lowering it below `total_friended` is allowed and
    /// leaves `remaining_quota` negative.
    pub fn set_max_allowed(&mut self, max_allowed: i64) -> Result<(), QuotaError> {
        ensure_non_negative("max_allowed", max_allowed)?;
        self.max_allowed = max_allowed;
        Ok(())
    }

    /// Administrative override of the usage counter. The value may exceed
    /// `max_allowed`.
    pub fn override_total_friended(&mut self, total_friended: i64) -> Result<(), QuotaError> {
        ensure_non_negative("total_friended", total_friended)?;
        self.total_friended = total_friended;
        Ok(())
    }
}

pub(crate) fn normalize_email(email: String) -> Result<String, QuotaError> {
    let trimmed = email.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(QuotaError::InvalidEmail(email));
    }
    Ok(trimmed.to_string())
}

fn ensure_non_negative(field: &str, value: i64) -> Result<(), QuotaError> {
    if value < 0 {
        return Err(QuotaError::InvalidQuotaValue(format!(
            "{field} must not be negative, got {value}"
        )));
    }
    Ok(())
}
