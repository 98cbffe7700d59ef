//! Provider factory for creating backup provider backends
//!
//! Backend selection happens once, at setup time, based on configuration. The
//! rest of the crate only ever sees `Arc<dyn BackupProvider>`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::providers::{BackupProvider, CoreProvider, ProviderError, SupervisorProvider};

fn default_supervisor_url() -> String {
    "http://supervisor".to_string()
}

/// Configuration for the supervisor HTTP API backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SupervisorConfig {
    /// Base URL of the supervisor API
    #[serde(default = "default_supervisor_url")]
    pub base_url: String,
    /// Bearer token for authentication
    pub token: String,
}

impl SupervisorConfig {
    /// Creates a configuration with the default supervisor URL
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: default_supervisor_url(),
            token: token.into(),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.base_url.is_empty() {
            return Err(ProviderError::config("Supervisor base URL cannot be empty"));
        }
        if self.token.is_empty() {
            return Err(ProviderError::config("Supervisor token is required"));
        }
        Ok(())
    }
}

/// Configuration for the core REST API backend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Base URL of the core API
    pub base_url: String,
    /// Bearer token for authentication
    pub token: String,
}

impl CoreConfig {
    /// Creates a new core API configuration
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.base_url.is_empty() {
            return Err(ProviderError::config("Core API base URL cannot be empty"));
        }
        if self.token.is_empty() {
            return Err(ProviderError::config("Core API token is required"));
        }
        Ok(())
    }
}

/// Backend selection, tagged by provider type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// Supervisor HTTP API (supervised installations)
    Supervisor(SupervisorConfig),
    /// Core REST API (everything else)
    Core(CoreConfig),
}

impl ProviderConfig {
    /// Validates the wrapped backend configuration
    pub fn validate(&self) -> Result<(), ProviderError> {
        match self {
            ProviderConfig::Supervisor(cfg) => cfg.validate(),
            ProviderConfig::Core(cfg) => cfg.validate(),
        }
    }

    /// Returns true for backends that understand partial backups
    pub fn is_supervised(&self) -> bool {
        matches!(self, ProviderConfig::Supervisor(_))
    }
}

/// Factory for creating provider backends from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    /// Creates the backend selected by the configuration
    pub fn create(config: ProviderConfig) -> Result<Arc<dyn BackupProvider>, ProviderError> {
        config.validate()?;
        match config {
            ProviderConfig::Supervisor(cfg) => Ok(Arc::new(SupervisorProvider::new(cfg)?)),
            ProviderConfig::Core(cfg) => Ok(Arc::new(CoreProvider::new(cfg)?)),
        }
    }
}
