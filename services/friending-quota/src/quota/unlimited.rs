use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Addresses that were hardcoded as test accounts and never charged.
pub const LEGACY_UNLIMITED_EMAILS: [&str; 2] = ["test@test.com", "brandnew@email.com"];

/// Emails that bypass the friending quota entirely.
///
/// Matching is exact and case-sensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlimitedIdentifiers {
    emails: BTreeSet<String>,
}

impl UnlimitedIdentifiers {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| {
                    let email: String = email.into();
                    email.trim().to_string()
                })
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    pub fn legacy() -> Self {
        Self::new(LEGACY_UNLIMITED_EMAILS)
    }

    /// Parses a comma separated list. Blank entries are skipped.
    pub fn parse_list(value: &str) -> Self {
        Self::new(value.split(','))
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(email)
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.emails.iter().map(String::as_str)
    }
}
