//! Expiry record persistence
//!
//! The expiry mapping is the sole persisted state of this crate: one versioned
//! JSON document mapping backup slug to its UTC expiry timestamp. It is loaded
//! once at startup and overwritten wholesale on every mutation; there is no
//! incremental or append format.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

/// Current on-disk document version
const STORAGE_VERSION: u32 = 1;

/// Errors from loading or saving the expiry store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access expiry store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Expiry store contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unsupported expiry store version {found} (expected {STORAGE_VERSION})")]
    UnsupportedVersion { found: u32 },
}

/// On-disk document layout
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    /// Slug to expiry, serialized as RFC 3339 UTC strings
    backups: HashMap<String, DateTime<Utc>>,
}

/// File-backed store for the expiry mapping
pub struct ExpiryStore {
    path: PathBuf,
}

impl ExpiryStore {
    /// Creates a store over the given file path
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the backing file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Loads the expiry mapping; a missing file yields an empty mapping
    pub async fn load(&self) -> Result<HashMap<String, DateTime<Utc>>, StoreError> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No expiry store found, starting empty");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(e.into()),
        };

        let document: StoreDocument = serde_json::from_str(&json)?;
        if document.version != STORAGE_VERSION {
            return Err(StoreError::UnsupportedVersion {
                found: document.version,
            });
        }

        info!(
            path = %self.path.display(),
            monitored = document.backups.len(),
            "Loaded expiry store"
        );
        Ok(document.backups)
    }

    /// Overwrites the store with the given mapping
    pub async fn save(&self, backups: &HashMap<String, DateTime<Utc>>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let document = StoreDocument {
            version: STORAGE_VERSION,
            backups: backups.clone(),
        };
        let json = serde_json::to_string_pretty(&document)?;
        fs::write(&self.path, json).await?;

        debug!(path = %self.path.display(), monitored = backups.len(), "Saved expiry store");
        Ok(())
    }
}
