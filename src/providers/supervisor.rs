//! Supervisor HTTP API backend
//!
//! Talks to the supervisor's REST API. Every endpoint wraps its result in the
//! `{result, data, message}` envelope; a non-"ok" result becomes a
//! `ProviderError::Api` carrying the envelope message.
//!
//! Backup creation and download use the caller-supplied timeout; removal and
//! add-on listing use their own fixed timeouts.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::providers::factory::SupervisorConfig;
use crate::providers::{Addon, BackupPayload, BackupProvider, CreatedBackup, ProviderError};

/// Fixed timeout for backup removal
const REMOVE_TIMEOUT: Duration = Duration::from_secs(300);
/// Fixed timeout for add-on listing and other small queries
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Response envelope used by every supervisor endpoint
#[derive(Debug, Deserialize)]
struct ApiResponse {
    /// "ok" or "error"
    result: String,
    /// Endpoint-specific payload
    #[serde(default)]
    data: serde_json::Value,
    /// Error message when result is "error"
    #[serde(default)]
    message: Option<String>,
}

/// Add-on listing payload
#[derive(Debug, Deserialize)]
struct AddonList {
    #[serde(default)]
    addons: Vec<Addon>,
}

/// Backend for the supervisor HTTP API
#[derive(Debug, Clone)]
pub struct SupervisorProvider {
    /// Base URL of the supervisor, e.g. "http://supervisor"
    base_url: String,
    /// Bearer token for authentication
    token: String,
    /// HTTP client for making requests
    client: Client,
}

impl SupervisorProvider {
    /// Creates a new supervisor backend from its configuration
    ///
    /// Timeouts are applied per request, not on the client, because backup
    /// creation and small queries need very different limits.
    pub fn new(config: SupervisorConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            client,
        })
    }

    /// Sends a command to the supervisor and unwraps the response envelope
    async fn send_command(
        &self,
        method: Method,
        command: &str,
        payload: Option<&BackupPayload>,
        timeout: Duration,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}{}", self.base_url, command);
        debug!(%url, method = %method, timeout_seconds = timeout.as_secs(), "Sending supervisor command");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .timeout(timeout);

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::BAD_REQUEST {
            error!(command, status = status.as_u16(), "Supervisor returned unexpected status");
            return Err(ProviderError::api(
                format!("{} returned status {}", command, status.as_u16()),
                Some(status.as_u16().to_string()),
            ));
        }

        let envelope: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;

        if envelope.result == "ok" {
            Ok(envelope.data)
        } else {
            Err(ProviderError::api(
                envelope
                    .message
                    .unwrap_or_else(|| format!("{} failed without a message", command)),
                None::<String>,
            ))
        }
    }
}

#[async_trait::async_trait]
impl BackupProvider for SupervisorProvider {
    async fn list_addons(&self) -> Result<Vec<Addon>, ProviderError> {
        let data = self
            .send_command(Method::GET, "/addons", None, QUERY_TIMEOUT)
            .await?;
        let list: AddonList = serde_json::from_value(data)?;
        Ok(list.addons.into_iter().filter(|a| a.installed).collect())
    }

    async fn create_backup(
        &self,
        payload: &BackupPayload,
        partial: bool,
        timeout: Duration,
    ) -> Result<CreatedBackup, ProviderError> {
        let backup_type = if partial { "partial" } else { "full" };
        let command = format!("/backups/new/{}", backup_type);

        let data = self
            .send_command(Method::POST, &command, Some(payload), timeout)
            .await
            .map_err(|err| match err {
                // the supervisor rejects overlapping creations with an envelope error
                ProviderError::Api { message, code: None } => ProviderError::conflict(message),
                other => other,
            })?;

        let created: CreatedBackup = serde_json::from_value(data)?;
        Ok(created)
    }

    async fn remove_backup(&self, slug: &str) -> Result<(), ProviderError> {
        let command = format!("/backups/{}", slug);
        self.send_command(Method::DELETE, &command, None, REMOVE_TIMEOUT)
            .await
            .map_err(|err| match &err {
                ProviderError::Api { message, .. }
                    if message.to_lowercase().contains("does not exist") =>
                {
                    ProviderError::not_found(slug)
                }
                _ => err,
            })?;
        Ok(())
    }

    async fn download_backup(
        &self,
        slug: &str,
        destination: &Path,
        timeout: Duration,
    ) -> Result<(), ProviderError> {
        let command = format!("/backups/{}/download", slug);
        let url = format!("{}{}", self.base_url, command);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::not_found(slug));
        }
        if status != StatusCode::OK {
            error!(command, status = status.as_u16(), "Supervisor returned unexpected status");
            return Err(ProviderError::api(
                format!("{} returned status {}", command, status.as_u16()),
                Some(status.as_u16().to_string()),
            ));
        }

        let mut file = tokio::fs::File::create(destination).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        info!(slug, destination = %destination.display(), "Downloaded backup");
        Ok(())
    }

    fn supports_partial(&self) -> bool {
        true
    }

    fn provider_name(&self) -> &'static str {
        "supervisor"
    }
}
