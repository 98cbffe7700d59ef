//! Mock backup provider for testing
//!
//! Scripted implementation of `BackupProvider` for unit tests. Responses and
//! errors are configured up front; calls and payloads are recorded so tests can
//! verify what the manager actually sent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::providers::{Addon, BackupPayload, BackupProvider, CreatedBackup, ProviderError};

/// Mock provider for testing
///
/// All state sits behind `Arc<Mutex<..>>` so a clone handed to the manager and
/// the copy kept by the test observe the same calls.
#[derive(Clone)]
pub struct MockBackupProvider {
    /// Installed add-ons returned by `list_addons`
    addons: Arc<Mutex<Vec<Addon>>>,
    /// Error to return from `list_addons`, if any
    list_error: Arc<Mutex<Option<ProviderError>>>,
    /// Result template for `create_backup`
    create_result: Arc<Mutex<Result<CreatedBackup, ProviderError>>>,
    /// Artificial delay before `create_backup` resolves
    create_delay: Arc<Mutex<Option<Duration>>>,
    /// Per-slug scripted errors for `remove_backup`
    remove_errors: Arc<Mutex<HashMap<String, ProviderError>>>,
    /// Error to return from `download_backup`, if any
    download_error: Arc<Mutex<Option<ProviderError>>>,
    /// Whether this backend claims partial-backup support
    supports_partial: Arc<Mutex<bool>>,
    /// Payloads passed to `create_backup`, with the partial flag
    create_calls: Arc<Mutex<Vec<(BackupPayload, bool)>>>,
    /// Slugs passed to `remove_backup`
    remove_calls: Arc<Mutex<Vec<String>>>,
    /// Destinations passed to `download_backup`
    download_calls: Arc<Mutex<Vec<(String, PathBuf)>>>,
}

impl MockBackupProvider {
    /// Creates a mock that succeeds with slug "mock-slug" and no add-ons
    pub fn new() -> Self {
        Self {
            addons: Arc::new(Mutex::new(Vec::new())),
            list_error: Arc::new(Mutex::new(None)),
            create_result: Arc::new(Mutex::new(Ok(CreatedBackup {
                slug: "mock-slug".to_string(),
                name: None,
            }))),
            create_delay: Arc::new(Mutex::new(None)),
            remove_errors: Arc::new(Mutex::new(HashMap::new())),
            download_error: Arc::new(Mutex::new(None)),
            supports_partial: Arc::new(Mutex::new(true)),
            create_calls: Arc::new(Mutex::new(Vec::new())),
            remove_calls: Arc::new(Mutex::new(Vec::new())),
            download_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sets the installed add-ons
    pub fn set_addons(&self, addons: Vec<Addon>) {
        *self.addons.lock().unwrap() = addons;
    }

    /// Makes `list_addons` fail
    pub fn fail_list(&self, error: ProviderError) {
        *self.list_error.lock().unwrap() = Some(error);
    }

    /// Makes `create_backup` succeed with the given slug
    pub fn set_create_slug(&self, slug: impl Into<String>) {
        *self.create_result.lock().unwrap() = Ok(CreatedBackup {
            slug: slug.into(),
            name: None,
        });
    }

    /// Makes `create_backup` fail
    pub fn fail_create(&self, error: ProviderError) {
        *self.create_result.lock().unwrap() = Err(error);
    }

    /// Delays `create_backup` to exercise overlapping submissions
    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.lock().unwrap() = Some(delay);
    }

    /// Makes `remove_backup` fail for one specific slug
    pub fn fail_remove(&self, slug: impl Into<String>, error: ProviderError) {
        self.remove_errors.lock().unwrap().insert(slug.into(), error);
    }

    /// Makes `download_backup` fail
    pub fn fail_download(&self, error: ProviderError) {
        *self.download_error.lock().unwrap() = Some(error);
    }

    /// Controls the partial-backup capability flag
    pub fn set_supports_partial(&self, value: bool) {
        *self.supports_partial.lock().unwrap() = value;
    }

    /// Returns the recorded `create_backup` calls
    pub fn create_calls(&self) -> Vec<(BackupPayload, bool)> {
        self.create_calls.lock().unwrap().clone()
    }

    /// Returns the recorded `remove_backup` calls
    pub fn remove_calls(&self) -> Vec<String> {
        self.remove_calls.lock().unwrap().clone()
    }

    /// Returns the recorded `download_backup` calls
    pub fn download_calls(&self) -> Vec<(String, PathBuf)> {
        self.download_calls.lock().unwrap().clone()
    }
}

impl Default for MockBackupProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BackupProvider for MockBackupProvider {
    async fn list_addons(&self) -> Result<Vec<Addon>, ProviderError> {
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.addons.lock().unwrap().clone())
    }

    async fn create_backup(
        &self,
        payload: &BackupPayload,
        partial: bool,
        _timeout: Duration,
    ) -> Result<CreatedBackup, ProviderError> {
        self.create_calls
            .lock()
            .unwrap()
            .push((payload.clone(), partial));

        let delay = *self.create_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.create_result.lock().unwrap().clone()
    }

    async fn remove_backup(&self, slug: &str) -> Result<(), ProviderError> {
        self.remove_calls.lock().unwrap().push(slug.to_string());
        match self.remove_errors.lock().unwrap().get(slug) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn download_backup(
        &self,
        slug: &str,
        destination: &Path,
        _timeout: Duration,
    ) -> Result<(), ProviderError> {
        self.download_calls
            .lock()
            .unwrap()
            .push((slug.to_string(), destination.to_path_buf()));
        match self.download_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn supports_partial(&self) -> bool {
        *self.supports_partial.lock().unwrap()
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_create_calls() {
        let mock = MockBackupProvider::new();
        mock.set_create_slug("abc123");

        let payload = BackupPayload {
            name: "Nightly".to_string(),
            ..Default::default()
        };
        let created = mock
            .create_backup(&payload, true, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(created.slug, "abc123");
        let calls = mock.create_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.name, "Nightly");
        assert!(calls[0].1);
    }

    #[tokio::test]
    async fn test_mock_scripted_remove_error() {
        let mock = MockBackupProvider::new();
        mock.fail_remove("gone", ProviderError::not_found("gone"));

        assert!(mock.remove_backup("kept").await.is_ok());
        assert!(mock.remove_backup("gone").await.unwrap_err().is_not_found());
        assert_eq!(mock.remove_calls(), vec!["kept", "gone"]);
    }
}
