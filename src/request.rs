//! Backup request shapes and normalization
//!
//! Callers historically used two spellings for the same thing: nested
//! `include`/`exclude` blocks, or flat `include_addons`/`exclude_folders`/...
//! lists. `RawBackupRequest` accepts both; `normalize` folds them into the one
//! canonical `BackupRequest` that the selector and manager operate on.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Add-on and folder name lists inside an include or exclude block
///
/// Entries are user-facing names or shell-style wildcard patterns, not yet
/// resolved to canonical identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ItemSelection {
    /// Add-on names, slugs or wildcard patterns
    #[serde(default)]
    pub addons: Vec<String>,
    /// Folder aliases or ids
    #[serde(default)]
    pub folders: Vec<String>,
}

impl ItemSelection {
    /// Creates a selection from name lists
    pub fn new(addons: Vec<String>, folders: Vec<String>) -> Self {
        Self { addons, folders }
    }

    /// Returns true when neither addons nor folders are named
    pub fn is_empty(&self) -> bool {
        self.addons.is_empty() && self.folders.is_empty()
    }
}

fn default_compressed() -> bool {
    true
}

/// Canonical backup request
///
/// Constructed per invocation; `include`/`exclude` are stripped before the
/// request is forwarded to the provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupRequest {
    /// Human label; a generated default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Encryption password; never logged in plaintext
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Days until expiry; absent means never purged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_days: Option<f64>,
    /// Directories to copy the finished backup into
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub download_paths: Vec<PathBuf>,
    /// Whether the archive should be compressed
    #[serde(default = "default_compressed")]
    pub compressed: bool,
    /// Encrypt with the configured default key when no password is given
    #[serde(default)]
    pub encrypted: bool,
    /// Skip the database inside the configuration folder
    #[serde(default)]
    pub exclude_database: bool,
    /// Provider-specific target location, passed through unmodified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Items to include (partial backup)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<ItemSelection>,
    /// Items to exclude from a full backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<ItemSelection>,
}

impl Default for BackupRequest {
    fn default() -> Self {
        Self {
            name: None,
            password: None,
            keep_days: None,
            download_paths: Vec::new(),
            compressed: true,
            encrypted: false,
            exclude_database: false,
            location: None,
            include: None,
            exclude: None,
        }
    }
}

impl BackupRequest {
    /// Returns true when the request is a full backup in the provider's native
    /// sense, with no include or exclude to resolve
    pub fn is_full(&self) -> bool {
        self.include.as_ref().is_none_or(ItemSelection::is_empty)
            && self.exclude.as_ref().is_none_or(ItemSelection::is_empty)
    }
}

/// Wire shape accepted from callers, covering the legacy field spellings
///
/// Flat `include_addons`/... lists fold into the nested blocks; when both
/// spellings are present for the same side, the nested block wins.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawBackupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub keep_days: Option<f64>,
    /// Accepts both `download_path` and `download_paths`
    #[serde(default, alias = "download_path")]
    pub download_paths: Vec<PathBuf>,
    #[serde(default = "default_compressed")]
    pub compressed: bool,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub exclude_database: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub include: Option<ItemSelection>,
    #[serde(default)]
    pub exclude: Option<ItemSelection>,
    #[serde(default)]
    pub include_addons: Vec<String>,
    #[serde(default)]
    pub include_folders: Vec<String>,
    #[serde(default)]
    pub exclude_addons: Vec<String>,
    #[serde(default)]
    pub exclude_folders: Vec<String>,
}

impl RawBackupRequest {
    /// Folds the legacy spellings into the canonical request shape
    pub fn normalize(self) -> BackupRequest {
        let include = self.include.or_else(|| {
            let flat = ItemSelection::new(self.include_addons, self.include_folders);
            (!flat.is_empty()).then_some(flat)
        });
        let exclude = self.exclude.or_else(|| {
            let flat = ItemSelection::new(self.exclude_addons, self.exclude_folders);
            (!flat.is_empty()).then_some(flat)
        });

        BackupRequest {
            name: self.name,
            password: self.password,
            keep_days: self.keep_days,
            download_paths: self.download_paths,
            compressed: self.compressed,
            encrypted: self.encrypted,
            exclude_database: self.exclude_database,
            // "/backup" is the provider's default location; treat it as unset
            location: self.location.filter(|l| l != "/backup"),
            include,
            exclude,
        }
    }
}
