//! Backup provider module for autobackup
//!
//! This module defines the trait and types for integrating with backup providers:
//! the supervisor HTTP API on supervised installations and the core REST API
//! everywhere else.
//!
//! # Architecture
//!
//! The provider system uses a trait-based approach to allow multiple backends:
//! - `BackupProvider` trait defines the four operations every backend must implement
//! - Backend-specific implementations are in separate modules
//! - `ProviderFactory` creates the appropriate backend based on configuration
//!
//! The manager only ever sees `Arc<dyn BackupProvider>`; which backend sits behind
//! it is decided once at setup time.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod core;
pub mod error;
pub mod factory;
#[cfg(test)]
pub mod mock;
pub mod supervisor;

pub use self::core::CoreProvider;
pub use error::ProviderError;
pub use factory::{CoreConfig, ProviderConfig, ProviderFactory, SupervisorConfig};
pub use supervisor::SupervisorProvider;

fn default_installed() -> bool {
    true
}

/// An add-on known to the provider
///
/// The provider list is untrusted input: display names may collide (even
/// case-insensitively), which the selector deliberately does not paper over.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Addon {
    /// Canonical, stable identifier
    pub slug: String,
    /// Human display name
    pub name: String,
    /// Whether the add-on is currently installed
    #[serde(default = "default_installed")]
    pub installed: bool,
}

impl Addon {
    /// Creates a new installed add-on entry
    pub fn new(slug: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            installed: true,
        }
    }
}

/// Concrete payload forwarded to the provider's create-backup operation
///
/// This is the resolved form of a `BackupRequest`: symbolic include/exclude
/// specifications have already been turned into slug and folder-id lists and
/// stripped from the request.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BackupPayload {
    /// Backup label
    pub name: String,
    /// Optional encryption password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Whether the archive should be compressed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed: Option<bool>,
    /// Provider-specific target location, passed through unmodified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Skip the database inside the configuration folder
    #[serde(
        rename = "homeassistant_exclude_database",
        skip_serializing_if = "Option::is_none"
    )]
    pub exclude_database: Option<bool>,
    /// Add-on slugs to include (partial backups only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<String>>,
    /// Folder ids to include (partial backups only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folders: Option<Vec<String>>,
}

impl BackupPayload {
    /// Returns a copy safe for logging, with the password masked
    ///
    /// Masking is strictly a logging-time transformation; the real payload is
    /// forwarded to the provider untouched.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.password.is_some() {
            copy.password = Some("<hidden>".to_string());
        }
        copy
    }
}

/// Result of a successful create-backup call
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreatedBackup {
    /// Identifier assigned by the provider
    pub slug: String,
    /// Name the provider recorded, when it reports one
    #[serde(default)]
    pub name: Option<String>,
}

/// Trait for backup provider backends
///
/// All implementations must be Send + Sync so the manager can hand them to
/// detached download tasks.
#[async_trait::async_trait]
pub trait BackupProvider: Send + Sync {
    /// Returns the list of installed add-ons
    async fn list_addons(&self) -> Result<Vec<Addon>, ProviderError>;

    /// Creates a full or partial backup
    ///
    /// Fails with a provider error if creation cannot start (for example a
    /// concurrent backup already running) or times out.
    async fn create_backup(
        &self,
        payload: &BackupPayload,
        partial: bool,
        timeout: Duration,
    ) -> Result<CreatedBackup, ProviderError>;

    /// Removes a backup
    ///
    /// Returns `ProviderError::NotFound` when the provider no longer knows the
    /// slug; callers decide whether that counts as success.
    async fn remove_backup(&self, slug: &str) -> Result<(), ProviderError>;

    /// Downloads a backup archive to the given destination file
    async fn download_backup(
        &self,
        slug: &str,
        destination: &Path,
        timeout: Duration,
    ) -> Result<(), ProviderError>;

    /// Returns true if this backend understands partial backups
    ///
    /// Used for synchronous request validation, before any provider call.
    fn supports_partial(&self) -> bool;

    /// Returns the backend name, used for logging and identification
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addon_defaults_to_installed() {
        let addon: Addon = serde_json::from_str(r#"{"slug": "core_ssh", "name": "SSH"}"#).unwrap();
        assert!(addon.installed);

        let addon: Addon =
            serde_json::from_str(r#"{"slug": "core_ssh", "name": "SSH", "installed": false}"#)
                .unwrap();
        assert!(!addon.installed);
    }

    #[test]
    fn test_payload_redaction_masks_password() {
        let payload = BackupPayload {
            name: "Nightly".to_string(),
            password: Some("hunter2".to_string()),
            ..Default::default()
        };

        let redacted = payload.redacted();
        assert_eq!(redacted.password.as_deref(), Some("<hidden>"));
        // the original is untouched
        assert_eq!(payload.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_payload_redaction_without_password() {
        let payload = BackupPayload {
            name: "Nightly".to_string(),
            ..Default::default()
        };
        assert_eq!(payload.redacted(), payload);
    }

    #[test]
    fn test_payload_serialization_skips_absent_fields() {
        let payload = BackupPayload {
            name: "Nightly".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Nightly"}));
    }

    #[test]
    fn test_payload_serialization_renames_exclude_database() {
        let payload = BackupPayload {
            name: "Nightly".to_string(),
            exclude_database: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["homeassistant_exclude_database"], true);
    }

    #[test]
    fn test_created_backup_optional_name() {
        let created: CreatedBackup = serde_json::from_str(r#"{"slug": "9ecf0028"}"#).unwrap();
        assert_eq!(created.slug, "9ecf0028");
        assert!(created.name.is_none());
    }
}
