use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::schema::Config;
use crate::providers::{ProviderConfig, SupervisorConfig};

#[cfg(test)]
use std::sync::Mutex;

#[cfg(test)]
static CONFIG_TEST_ENV_LOCK: Mutex<()> = Mutex::new(());

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file contains invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
}

/// Loads configuration with file, environment, CLI-path precedence
///
/// Layer 1 is the config file (default `~/.autobackup/config.json`, or the
/// path given on the command line); layer 2 is environment variables. A
/// missing file is fine; an unreadable or invalid one is an error.
pub fn load_config(cli_config_path: Option<PathBuf>) -> Result<Config> {
    tracing::debug!("Loading configuration");

    let mut config = Config::default();

    let config_file = cli_config_path.or_else(get_default_config_path);
    if let Some(ref path) = config_file {
        if path.exists() {
            tracing::debug!(config_path = %path.display(), "Loading configuration from file");
            config = read_config_file(path)?;
        } else {
            tracing::debug!(config_path = %path.display(), "Config file not found, using defaults");
        }
    }

    config = merge_env_variables(config);

    let summary = config.get_safe_summary();
    tracing::debug!(
        auto_purge = summary.auto_purge,
        backup_timeout = summary.backup_timeout,
        provider = ?summary.provider,
        encryption_key_configured = summary.encryption_key_configured,
        "Configuration loaded successfully"
    );

    Ok(config)
}

/// Default config file location
pub fn get_default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".autobackup").join("config.json"))
}

/// Default expiry store location
pub fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".autobackup")
        .join("expiries.json")
}

fn read_config_file(path: &PathBuf) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .map_err(ConfigError::IoError)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = serde_json::from_str(&contents)
        .map_err(ConfigError::InvalidJson)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

/// Applies environment variable overrides
///
/// `SUPERVISOR_TOKEN` (with optional `SUPERVISOR_URL`) selects the supervisor
/// backend when the file configured none; this is how the crate picks up the
/// ambient credentials of a supervised installation.
fn merge_env_variables(mut config: Config) -> Config {
    if let Ok(value) = std::env::var("AUTOBACKUP_AUTO_PURGE") {
        match value.to_lowercase().as_str() {
            "1" | "true" | "yes" => config.auto_purge = true,
            "0" | "false" | "no" => config.auto_purge = false,
            other => tracing::warn!(value = other, "Ignoring invalid AUTOBACKUP_AUTO_PURGE"),
        }
    }

    if let Ok(value) = std::env::var("AUTOBACKUP_BACKUP_TIMEOUT") {
        match value.parse::<u64>() {
            Ok(minutes) => config.backup_timeout = minutes,
            Err(_) => tracing::warn!(value, "Ignoring invalid AUTOBACKUP_BACKUP_TIMEOUT"),
        }
    }

    if let Ok(value) = std::env::var("AUTOBACKUP_STORE_PATH") {
        config.store_path = Some(PathBuf::from(value));
    }

    if let Ok(value) = std::env::var("AUTOBACKUP_ENCRYPTION_KEY") {
        config.default_encryption_key = Some(value);
    }

    if config.provider.is_none() {
        if let Ok(token) = std::env::var("SUPERVISOR_TOKEN") {
            let mut supervisor = SupervisorConfig::new(token);
            if let Ok(url) = std::env::var("SUPERVISOR_URL") {
                supervisor.base_url = url;
            }
            config.provider = Some(ProviderConfig::Supervisor(supervisor));
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clear_env() {
        for key in [
            "AUTOBACKUP_AUTO_PURGE",
            "AUTOBACKUP_BACKUP_TIMEOUT",
            "AUTOBACKUP_STORE_PATH",
            "AUTOBACKUP_ENCRYPTION_KEY",
            "SUPERVISOR_TOKEN",
            "SUPERVISOR_URL",
        ] {
            unsafe { std::env::remove_var(key) };
        }
    }

    #[test]
    fn test_env_overrides_auto_purge_and_timeout() {
        let _guard = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("AUTOBACKUP_AUTO_PURGE", "false");
            std::env::set_var("AUTOBACKUP_BACKUP_TIMEOUT", "45");
        }

        let config = merge_env_variables(Config::default());
        assert!(!config.auto_purge);
        assert_eq!(config.backup_timeout, 45);
        clear_env();
    }

    #[test]
    fn test_supervisor_token_selects_supervisor_backend() {
        let _guard = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe { std::env::set_var("SUPERVISOR_TOKEN", "env-token") };

        let config = merge_env_variables(Config::default());
        match config.provider {
            Some(ProviderConfig::Supervisor(cfg)) => {
                assert_eq!(cfg.token, "env-token");
                assert_eq!(cfg.base_url, "http://supervisor");
            }
            other => panic!("expected supervisor provider, got {:?}", other),
        }
        clear_env();
    }

    #[test]
    fn test_file_provider_wins_over_env_token() {
        let _guard = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe { std::env::set_var("SUPERVISOR_TOKEN", "env-token") };

        let mut config = Config::default();
        config.provider = Some(ProviderConfig::Supervisor(SupervisorConfig::new(
            "file-token",
        )));
        let config = merge_env_variables(config);

        match config.provider {
            Some(ProviderConfig::Supervisor(cfg)) => assert_eq!(cfg.token, "file-token"),
            other => panic!("expected supervisor provider, got {:?}", other),
        }
        clear_env();
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let _guard = CONFIG_TEST_ENV_LOCK.lock().unwrap();
        clear_env();
        unsafe {
            std::env::set_var("AUTOBACKUP_AUTO_PURGE", "maybe");
            std::env::set_var("AUTOBACKUP_BACKUP_TIMEOUT", "soon");
        }

        let config = merge_env_variables(Config::default());
        assert!(config.auto_purge);
        assert_eq!(config.backup_timeout, 20);
        clear_env();
    }

    #[test]
    fn test_read_config_file_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        assert!(read_config_file(&path).is_err());
    }

    #[test]
    fn test_read_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"auto_purge": false, "provider": {"type": "core", "base_url": "http://homeassistant:8123", "token": "abc"}}"#,
        )
        .unwrap();

        let config = read_config_file(&path).unwrap();
        assert!(!config.auto_purge);
        assert!(matches!(config.provider, Some(ProviderConfig::Core(_))));
    }
}
