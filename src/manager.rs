//! Backup lifecycle manager
//!
//! Owns the expiry mapping and drives a backup request end-to-end: validation,
//! selector resolution for partial backups, submission to the provider, expiry
//! bookkeeping, detached downloads, and the purge sweep.
//!
//! Provider failures never propagate out of the public operations here; they are
//! converted into `BackupFailed` events and the last-failure view. Only
//! validation errors are returned synchronously, before any provider call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::events::{BackupEvent, EventBus};
use crate::providers::{BackupPayload, BackupProvider, ProviderError};
use crate::request::BackupRequest;
use crate::selector;
use crate::store::{ExpiryStore, StoreError};

/// Errors surfaced synchronously to the caller, before any provider call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManagerError {
    #[error(
        "Partial backups (e.g. include/exclude) are not supported on non-supervised installations"
    )]
    PartialUnsupported,
}

/// Caller-configured manager behaviour
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Run a purge sweep after every create attempt
    pub auto_purge: bool,
    /// Timeout passed to the provider's create and download operations
    pub backup_timeout: Duration,
    /// Password used for `encrypted` requests that carry none of their own
    pub default_encryption_key: Option<String>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            auto_purge: true,
            backup_timeout: Duration::from_secs(20 * 60),
            default_encryption_key: None,
        }
    }
}

/// Details of the most recent failed creation
#[derive(Debug, Clone, PartialEq)]
pub struct LastFailure {
    /// Name of the failed backup
    pub name: String,
    /// Error text
    pub error: String,
    /// When the failure happened
    pub at: DateTime<Utc>,
}

/// Supplies the default label for unnamed requests
pub type NameSupplier = Box<dyn Fn() -> String + Send + Sync>;

/// Orchestrates backup creation and expiry-based purging
///
/// All mutation of the expiry mapping happens through this type; the mapping is
/// loaded once via [`BackupManager::load`] and persisted after every change.
pub struct BackupManager {
    provider: Arc<dyn BackupProvider>,
    store: ExpiryStore,
    events: Arc<EventBus>,
    options: RwLock<ManagerOptions>,
    /// Backup slug to UTC expiry; every key is believed to still exist on the provider
    expiries: RwLock<HashMap<String, DateTime<Utc>>>,
    /// Number of creations currently in flight
    in_progress: AtomicUsize,
    last_failure: RwLock<Option<LastFailure>>,
    name_supplier: NameSupplier,
    /// Whether the backend understands partial backups
    supervised: bool,
}

impl BackupManager {
    /// Creates a manager over the given provider, store and event bus
    pub fn new(
        provider: Arc<dyn BackupProvider>,
        store: ExpiryStore,
        events: Arc<EventBus>,
        options: ManagerOptions,
    ) -> Self {
        let supervised = provider.supports_partial();
        Self {
            provider,
            store,
            events,
            options: RwLock::new(options),
            expiries: RwLock::new(HashMap::new()),
            in_progress: AtomicUsize::new(0),
            last_failure: RwLock::new(None),
            name_supplier: Box::new(move || default_backup_name(supervised)),
            supervised,
        }
    }

    /// Replaces the default-name supplier
    pub fn with_name_supplier(mut self, supplier: NameSupplier) -> Self {
        self.name_supplier = supplier;
        self
    }

    /// Loads the persisted expiry mapping; called once at startup
    pub async fn load(&self) -> Result<(), StoreError> {
        *self.expiries.write().await = self.store.load().await?;
        Ok(())
    }

    /// Applies updated options (config reload)
    pub async fn update_options(&self, options: ManagerOptions) {
        *self.options.write().await = options;
    }

    /// Number of creations currently in flight
    pub fn state(&self) -> usize {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Number of backups with a recorded expiry
    pub async fn monitored(&self) -> usize {
        self.expiries.read().await.len()
    }

    /// Number of backups whose expiry has passed
    pub async fn purgeable(&self) -> usize {
        let now = Utc::now();
        self.expiries
            .read()
            .await
            .values()
            .filter(|expiry| **expiry < now)
            .count()
    }

    /// The next expiry that has not yet passed
    pub async fn next_expiry(&self) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        self.expiries
            .read()
            .await
            .values()
            .filter(|expiry| **expiry > now)
            .min()
            .copied()
    }

    /// The most recent failed creation, if any
    pub async fn last_failure(&self) -> Option<LastFailure> {
        self.last_failure.read().await.clone()
    }

    /// Creates a backup from a declarative request
    ///
    /// Only validation errors are returned; everything past validation is
    /// reported through events. When auto-purge is enabled a purge sweep runs
    /// after the attempt, whether it succeeded or not.
    pub async fn create_backup(&self, mut request: BackupRequest) -> Result<(), ManagerError> {
        self.validate_request(&mut request)?;

        let name = request.name.clone().unwrap_or_default();
        debug!("Creating backup '{}'", name);

        let include = request.include.take().filter(|s| !s.is_empty());
        let exclude = request.exclude.take().filter(|s| !s.is_empty());

        if include.is_none() && exclude.is_none() {
            self.submit(request, None).await;
        } else {
            match self.provider.list_addons().await {
                Ok(installed) => {
                    debug!(?installed, "Installed addons");
                    let selection = selector::resolve_selection(
                        include.as_ref(),
                        exclude.as_ref(),
                        &installed,
                    );
                    debug!(addons = ?selection.0, folders = ?selection.1, "Resolved backup selection");
                    self.submit(request, Some(selection)).await;
                }
                Err(err) => {
                    // listing is part of the attempt; report it like any other provider failure
                    error!("Error during backup. {}", err);
                    self.record_failure(&name, &err).await;
                    self.events
                        .publish(BackupEvent::BackupFailed {
                            name,
                            error: err.to_string(),
                        })
                        .await;
                }
            }
        }

        if self.options.read().await.auto_purge {
            self.purge_backups().await;
        }

        Ok(())
    }

    /// Validates and normalizes a request before any provider call
    fn validate_request(&self, request: &mut BackupRequest) -> Result<(), ManagerError> {
        if !self.supervised {
            // an include naming only the configuration folder is what a core
            // full backup means anyway; drop it instead of rejecting
            if let Some(include) = &request.include {
                if request.exclude.is_none()
                    && include.addons.is_empty()
                    && selector::resolve_folders(&include.folders) == ["homeassistant"]
                {
                    request.include = None;
                }
            }

            if request.include.is_some() || request.exclude.is_some() {
                return Err(ManagerError::PartialUnsupported);
            }
        }

        if request.name.as_deref().is_none_or(str::is_empty) {
            request.name = Some((self.name_supplier)());
        }
        Ok(())
    }

    /// Submits one creation attempt and handles its terminal state
    async fn submit(&self, request: BackupRequest, selection: Option<(Vec<String>, Vec<String>)>) {
        let name = request.name.clone().unwrap_or_default();
        let partial = selection.is_some();

        // strip empty passwords; encrypted requests fall back to the default key
        let mut password = request.password.clone().filter(|p| !p.is_empty());
        if password.is_none() && request.encrypted {
            password = self.options.read().await.default_encryption_key.clone();
        }

        let payload = BackupPayload {
            name: name.clone(),
            password,
            compressed: Some(request.compressed),
            location: request.location.clone(),
            exclude_database: request.exclude_database.then_some(true),
            addons: selection.as_ref().map(|(addons, _)| addons.clone()),
            folders: selection.map(|(_, folders)| folders),
        };

        let timeout = self.options.read().await.backup_timeout;
        debug!(
            partial,
            keep_days = ?request.keep_days,
            timeout_seconds = timeout.as_secs(),
            payload = ?payload.redacted(),
            "Creating backup"
        );

        self.in_progress.fetch_add(1, Ordering::SeqCst);
        self.events
            .publish(BackupEvent::BackupStart { name: name.clone() })
            .await;

        match self.provider.create_backup(&payload, partial, timeout).await {
            Ok(created) => {
                let backup_name = created.name.clone().unwrap_or_else(|| name.clone());
                info!(
                    "Backup created successfully: '{}' ({})",
                    backup_name, created.slug
                );
                self.in_progress.fetch_sub(1, Ordering::SeqCst);
                self.events
                    .publish(BackupEvent::BackupSuccessful {
                        name: backup_name.clone(),
                        slug: created.slug.clone(),
                    })
                    .await;

                if let Some(keep_days) = request.keep_days {
                    self.record_expiry(&created.slug, keep_days).await;
                }

                for directory in request.download_paths {
                    self.spawn_download(&backup_name, &created.slug, directory, timeout);
                }
            }
            Err(err) => {
                error!("Error during backup. {}", err);
                self.in_progress.fetch_sub(1, Ordering::SeqCst);
                self.record_failure(&name, &err).await;
                self.events
                    .publish(BackupEvent::BackupFailed {
                        name,
                        error: err.to_string(),
                    })
                    .await;
            }
        }
    }

    /// Records an expiry for a freshly created backup and persists the mapping
    async fn record_expiry(&self, slug: &str, keep_days: f64) {
        let expiry = Utc::now() + TimeDelta::milliseconds((keep_days * 86_400_000.0) as i64);
        let mut expiries = self.expiries.write().await;
        expiries.insert(slug.to_string(), expiry);
        if let Err(err) = self.store.save(&expiries).await {
            error!("Failed to persist expiry store: {}", err);
        }
    }

    async fn record_failure(&self, name: &str, err: &ProviderError) {
        *self.last_failure.write().await = Some(LastFailure {
            name: name.to_string(),
            error: err.to_string(),
            at: Utc::now(),
        });
    }

    /// Downloads a finished backup as a detached task
    ///
    /// The creation call does not wait for downloads; failures are only logged.
    /// Silent failure is deliberate: a missing copy never un-creates a backup.
    fn spawn_download(&self, name: &str, slug: &str, directory: PathBuf, timeout: Duration) {
        let provider = Arc::clone(&self.provider);
        let name = name.to_string();
        let slug = slug.to_string();
        tokio::spawn(async move {
            let destination = download_destination(&name, &slug, &directory).await;
            if let Err(err) = provider.download_backup(&slug, &destination, timeout).await {
                error!(
                    slug,
                    destination = %destination.display(),
                    "Failed to download backup: {}",
                    err
                );
            }
        });
    }

    /// Removes every backup whose expiry has passed
    ///
    /// A provider "does not exist" counts as purged; any other error leaves the
    /// record in place for the next sweep. One store save and one event cover
    /// the whole sweep.
    pub async fn purge_backups(&self) {
        let now = Utc::now();
        let candidates: Vec<String> = {
            let expiries = self.expiries.read().await;
            expiries
                .iter()
                .filter(|(_, expiry)| **expiry < now)
                .map(|(slug, _)| slug.clone())
                .collect()
        };

        if candidates.is_empty() {
            debug!("No backups required purging");
            return;
        }

        let mut purged = Vec::new();
        for slug in candidates {
            debug!(slug = %slug, "Attempting to remove backup");
            match self.provider.remove_backup(&slug).await {
                Ok(()) => purged.push(slug),
                Err(err) if err.is_not_found() => {
                    warn!(
                        "Failed to purge backup: {}. If it was intentionally moved or deleted externally you can ignore this error.",
                        err
                    );
                    purged.push(slug);
                }
                Err(err) => {
                    error!(
                        slug = %slug,
                        "Failed to purge backup: {}. It remains a candidate for the next sweep.",
                        err
                    );
                }
            }
        }

        if purged.is_empty() {
            return;
        }

        {
            let mut expiries = self.expiries.write().await;
            for slug in &purged {
                expiries.remove(slug);
            }
            if let Err(err) = self.store.save(&expiries).await {
                error!("Failed to persist expiry store: {}", err);
            }
        }

        info!("Purged {} backups: {:?}", purged.len(), purged);
        self.events
            .publish(BackupEvent::BackupsPurged { slugs: purged })
            .await;
    }
}

/// Default label: local date on supervised installations, a version tag on core
fn default_backup_name(supervised: bool) -> String {
    if supervised {
        Local::now().format("%A, %b %d, %Y").to_string()
    } else {
        format!("Core {}", env!("CARGO_PKG_VERSION"))
    }
}

/// Picks the download file path inside the target directory
///
/// The backup name becomes the filename (whitespace collapsed to underscores,
/// `.tar` suffix ensured); an already-existing file falls back to `<slug>.tar`.
async fn download_destination(name: &str, slug: &str, directory: &Path) -> PathBuf {
    let mut filename = sanitize_filename::sanitize(name.trim().replace(char::is_whitespace, "_"));
    if filename.is_empty() {
        filename = slug.to_string();
    }
    if !filename.ends_with(".tar") {
        filename.push_str(".tar");
    }

    let destination = directory.join(&filename);
    if tokio::fs::try_exists(&destination).await.unwrap_or(false) {
        return directory.join(format!("{}.tar", slug));
    }
    destination
}
