use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::manager::ManagerOptions;
use crate::providers::ProviderConfig;

fn default_auto_purge() -> bool {
    true
}

fn default_backup_timeout() -> u64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Run a purge sweep after every create attempt
    #[serde(default = "default_auto_purge")]
    pub auto_purge: bool,

    /// Timeout for backup creation and download, in minutes
    #[serde(default = "default_backup_timeout")]
    pub backup_timeout: u64,

    /// Expiry store location; a per-user default is used when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,

    /// Password for `encrypted` requests that carry none of their own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_encryption_key: Option<String>,

    /// Backend selection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_purge: true,
            backup_timeout: default_backup_timeout(),
            store_path: None,
            default_encryption_key: None,
            provider: None,
        }
    }
}

/// Loggable view of the configuration, with secrets reduced to booleans
#[derive(Debug)]
pub struct SafeSummary {
    pub auto_purge: bool,
    pub backup_timeout: u64,
    pub provider: Option<&'static str>,
    pub encryption_key_configured: bool,
    pub store_path_overridden: bool,
}

impl Config {
    /// Returns a summary safe to include in logs
    pub fn get_safe_summary(&self) -> SafeSummary {
        SafeSummary {
            auto_purge: self.auto_purge,
            backup_timeout: self.backup_timeout,
            provider: self.provider.as_ref().map(|p| match p {
                ProviderConfig::Supervisor(_) => "supervisor",
                ProviderConfig::Core(_) => "core",
            }),
            encryption_key_configured: self.default_encryption_key.is_some(),
            store_path_overridden: self.store_path.is_some(),
        }
    }

    /// Converts the relevant options into the manager's shape
    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            auto_purge: self.auto_purge,
            backup_timeout: Duration::from_secs(self.backup_timeout * 60),
            default_encryption_key: self.default_encryption_key.clone(),
        }
    }
}
