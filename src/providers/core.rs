//! Core REST API backend
//!
//! Used on installations without a supervisor. The core API speaks plain REST
//! (status codes instead of a result envelope), only knows full backups, and has
//! no add-on registry, so `list_addons` and partial creation are unsupported.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use crate::providers::factory::CoreConfig;
use crate::providers::{Addon, BackupPayload, BackupProvider, CreatedBackup, ProviderError};

/// Fixed timeout for backup removal
const REMOVE_TIMEOUT: Duration = Duration::from_secs(300);

/// Create-backup body understood by the core API
#[derive(Debug, Serialize)]
struct CoreCreateRequest<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    include_database: bool,
}

/// Create-backup response from the core API
#[derive(Debug, Deserialize)]
struct CoreCreateResponse {
    backup_id: String,
    #[serde(default)]
    name: Option<String>,
}

/// Backend for the core REST API
#[derive(Debug, Clone)]
pub struct CoreProvider {
    /// Base URL of the core API, e.g. "http://homeassistant:8123"
    base_url: String,
    /// Bearer token for authentication
    token: String,
    /// HTTP client for making requests
    client: Client,
}

impl CoreProvider {
    /// Creates a new core backend from its configuration
    pub fn new(config: CoreConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/backups{}", self.base_url, path)
    }
}

#[async_trait::async_trait]
impl BackupProvider for CoreProvider {
    async fn list_addons(&self) -> Result<Vec<Addon>, ProviderError> {
        // there is no add-on registry without a supervisor
        Err(ProviderError::unsupported("list_addons"))
    }

    async fn create_backup(
        &self,
        payload: &BackupPayload,
        partial: bool,
        timeout: Duration,
    ) -> Result<CreatedBackup, ProviderError> {
        if partial {
            return Err(ProviderError::unsupported("partial backup"));
        }

        let body = CoreCreateRequest {
            name: &payload.name,
            password: payload.password.as_deref(),
            include_database: !payload.exclude_database.unwrap_or(false),
        };

        let response = self
            .client
            .post(self.url(""))
            .bearer_auth(&self.token)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                let created: CoreCreateResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;
                Ok(CreatedBackup {
                    slug: created.backup_id,
                    name: created.name,
                })
            }
            StatusCode::CONFLICT => Err(ProviderError::conflict("backup already running")),
            status => {
                error!(status = status.as_u16(), "Core API rejected backup creation");
                Err(ProviderError::api(
                    format!("create backup returned status {}", status.as_u16()),
                    Some(status.as_u16().to_string()),
                ))
            }
        }
    }

    async fn remove_backup(&self, slug: &str) -> Result<(), ProviderError> {
        let response = self
            .client
            .delete(self.url(&format!("/{}", slug)))
            .bearer_auth(&self.token)
            .timeout(REMOVE_TIMEOUT)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, REMOVE_TIMEOUT.as_secs()))?;

        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ProviderError::not_found(slug)),
            status => Err(ProviderError::api(
                format!("delete backup returned status {}", status.as_u16()),
                Some(status.as_u16().to_string()),
            )),
        }
    }

    async fn download_backup(
        &self,
        slug: &str,
        destination: &Path,
        timeout: Duration,
    ) -> Result<(), ProviderError> {
        let response = self
            .client
            .get(self.url(&format!("/{}/download", slug)))
            .bearer_auth(&self.token)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;

        match response.status() {
            StatusCode::OK => {
                let mut file = tokio::fs::File::create(destination).await?;
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk =
                        chunk.map_err(|e| ProviderError::from_reqwest(e, timeout.as_secs()))?;
                    file.write_all(&chunk).await?;
                }
                file.flush().await?;

                info!(slug, destination = %destination.display(), "Downloaded backup");
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(ProviderError::not_found(slug)),
            status => Err(ProviderError::api(
                format!("download backup returned status {}", status.as_u16()),
                Some(status.as_u16().to_string()),
            )),
        }
    }

    fn supports_partial(&self) -> bool {
        false
    }

    fn provider_name(&self) -> &'static str {
        "core"
    }
}
