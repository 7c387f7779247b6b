use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::quota::UnlimitedIdentifiers;

#[derive(Debug, Clone)]
pub struct FriendingQuotaConfig {
    pub server_host: String,
    pub server_port: u16,
    pub data_dir: PathBuf,
    pub default_max_allowed: i64,
    pub unlimited_emails: UnlimitedIdentifiers,
    pub log_level: String,
}

impl Default for FriendingQuotaConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8184,
            data_dir: PathBuf::from("data/friending"),
            default_max_allowed: 20,
            unlimited_emails: UnlimitedIdentifiers::legacy(),
            log_level: "info".to_string(),
        }
    }
}

impl FriendingQuotaConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("FRIENDING_QUOTA_HOST") {
            cfg.server_host = host;
        }
        if let Ok(port) = env::var("FRIENDING_QUOTA_PORT") {
            cfg.server_port = port
                .parse()
                .context("FRIENDING_QUOTA_PORT must be a valid u16")?;
        }
        if let Ok(dir) = env::var("FRIENDING_QUOTA_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Ok(limit) = env::var("DEFAULT_MAX_ALLOWED") {
            cfg.default_max_allowed = limit
                .parse()
                .context("DEFAULT_MAX_ALLOWED must be an integer")?;
        }
        // Unset keeps the legacy test accounts; an empty value disables exemptions.
        if let Ok(emails) = env::var("UNLIMITED_QUOTA_EMAILS") {
            cfg.unlimited_emails = UnlimitedIdentifiers::parse_list(&emails);
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        ensure_directory(&self.data_dir)?;

        if self.default_max_allowed < 0 {
            anyhow::bail!("DEFAULT_MAX_ALLOWED must not be negative");
        }
        if let Some(email) = self.unlimited_emails.iter().find(|email| !email.contains('@')) {
            anyhow::bail!("UNLIMITED_QUOTA_EMAILS contains an invalid email: {email}");
        }

        Ok(())
    }
}

fn ensure_directory(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            anyhow::bail!("{} exists but is not a directory", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("unable to create data directory {}", path.display()))?;
    }
    Ok(())
}
