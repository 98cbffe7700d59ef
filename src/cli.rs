use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use autobackup::config;
use autobackup::events::{BackupEvent, EventBus};
use autobackup::manager::BackupManager;
use autobackup::providers::ProviderFactory;
use autobackup::request::{BackupRequest, RawBackupRequest};
use autobackup::store::ExpiryStore;

#[derive(Parser)]
#[command(name = "autobackup")]
#[command(about = "autobackup - expiring backup manager for Home Assistant installations")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a backup; include/exclude options decide full vs partial
    Backup(BackupArgs),
    /// Create a full backup, optionally excluding add-ons and folders
    BackupFull(BackupFullArgs),
    /// Create a partial backup of the named add-ons and folders
    BackupPartial(BackupPartialArgs),
    /// Remove backups whose expiry has passed
    Purge,
    /// Display version information
    Version,
}

/// Options shared by every backup subcommand
#[derive(Args)]
pub struct CommonBackupArgs {
    /// Backup name; a date-based default is generated when omitted
    #[arg(long)]
    pub name: Option<String>,

    /// Password to encrypt the backup with
    #[arg(long)]
    pub password: Option<String>,

    /// Days until the backup expires and is purged; omit to keep forever
    #[arg(long)]
    pub keep_days: Option<f64>,

    /// Directory to copy the finished backup into; repeatable
    #[arg(long = "download-path", value_name = "DIR")]
    pub download_paths: Vec<PathBuf>,

    /// Store the archive uncompressed
    #[arg(long)]
    pub uncompressed: bool,

    /// Encrypt with the configured default key when no password is given
    #[arg(long)]
    pub encrypted: bool,

    /// Skip the database inside the configuration folder
    #[arg(long)]
    pub exclude_database: bool,

    /// Provider-specific target location
    #[arg(long)]
    pub location: Option<String>,
}

#[derive(Args)]
pub struct BackupArgs {
    #[command(flatten)]
    pub common: CommonBackupArgs,

    /// Add-ons to include, by name, slug or wildcard pattern
    #[arg(long = "include-addon", value_name = "ADDON")]
    pub include_addons: Vec<String>,

    /// Folders to include, by alias or id
    #[arg(long = "include-folder", value_name = "FOLDER")]
    pub include_folders: Vec<String>,

    /// Add-ons to exclude
    #[arg(long = "exclude-addon", value_name = "ADDON")]
    pub exclude_addons: Vec<String>,

    /// Folders to exclude
    #[arg(long = "exclude-folder", value_name = "FOLDER")]
    pub exclude_folders: Vec<String>,
}

#[derive(Args)]
pub struct BackupFullArgs {
    #[command(flatten)]
    pub common: CommonBackupArgs,

    /// Add-ons to exclude
    #[arg(long = "exclude-addon", value_name = "ADDON")]
    pub exclude_addons: Vec<String>,

    /// Folders to exclude
    #[arg(long = "exclude-folder", value_name = "FOLDER")]
    pub exclude_folders: Vec<String>,
}

#[derive(Args)]
pub struct BackupPartialArgs {
    #[command(flatten)]
    pub common: CommonBackupArgs,

    /// Add-ons to include
    #[arg(long = "addon", value_name = "ADDON")]
    pub addons: Vec<String>,

    /// Folders to include
    #[arg(long = "folder", value_name = "FOLDER")]
    pub folders: Vec<String>,
}

impl CommonBackupArgs {
    fn raw_request(self) -> RawBackupRequest {
        RawBackupRequest {
            name: self.name,
            password: self.password,
            keep_days: self.keep_days,
            download_paths: self.download_paths,
            compressed: !self.uncompressed,
            encrypted: self.encrypted,
            exclude_database: self.exclude_database,
            location: self.location,
            ..Default::default()
        }
    }
}

impl BackupArgs {
    fn into_request(self) -> BackupRequest {
        let mut raw = self.common.raw_request();
        raw.include_addons = self.include_addons;
        raw.include_folders = self.include_folders;
        raw.exclude_addons = self.exclude_addons;
        raw.exclude_folders = self.exclude_folders;
        raw.normalize()
    }
}

impl BackupFullArgs {
    fn into_request(self) -> BackupRequest {
        let mut raw = self.common.raw_request();
        raw.exclude_addons = self.exclude_addons;
        raw.exclude_folders = self.exclude_folders;
        raw.normalize()
    }
}

impl BackupPartialArgs {
    fn into_request(self) -> BackupRequest {
        let mut raw = self.common.raw_request();
        raw.include_addons = self.addons;
        raw.include_folders = self.folders;
        raw.normalize()
    }
}

pub fn run(cli: Cli) -> Result<()> {
    // single-threaded cooperative scheduling: all work shares one event loop
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;
    runtime.block_on(run_async(cli))
}

async fn run_async(cli: Cli) -> Result<()> {
    let command = match cli.command {
        Commands::Version => {
            println!("autobackup {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        command => command,
    };

    let config = config::load_config(cli.config)?;
    let provider_config = config.provider.clone().context(
        "No backup provider configured. Add one to the config file or set SUPERVISOR_TOKEN.",
    )?;
    let provider = ProviderFactory::create(provider_config)?;

    let store_path = config
        .store_path
        .clone()
        .unwrap_or_else(config::default_store_path);
    let store = ExpiryStore::new(store_path);

    let events = Arc::new(EventBus::new());
    let mut rx = events.subscribe().await;

    let manager = BackupManager::new(provider, store, events, config.manager_options());
    manager.load().await?;

    match command {
        Commands::Backup(args) => manager.create_backup(args.into_request()).await?,
        Commands::BackupFull(args) => manager.create_backup(args.into_request()).await?,
        Commands::BackupPartial(args) => manager.create_backup(args.into_request()).await?,
        Commands::Purge => manager.purge_backups().await,
        Commands::Version => unreachable!(),
    }

    while let Ok(event) = rx.try_recv() {
        report(&event);
    }
    Ok(())
}

/// Prints a lifecycle event for the terminal user
fn report(event: &BackupEvent) {
    match event {
        BackupEvent::BackupStart { name } => println!("Creating backup '{}'", name),
        BackupEvent::BackupSuccessful { name, slug } => {
            println!("Backup created: '{}' ({})", name, slug)
        }
        BackupEvent::BackupFailed { name, error } => {
            println!("Backup '{}' failed: {}", name, error)
        }
        BackupEvent::BackupsPurged { slugs } => {
            println!("Purged {} backup(s): {}", slugs.len(), slugs.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_partial_args_become_include_block() {
        let cli = Cli::try_parse_from([
            "autobackup",
            "backup-partial",
            "--addon",
            "core_ssh",
            "--folder",
            "config",
            "--keep-days",
            "3",
        ])
        .unwrap();

        let Commands::BackupPartial(args) = cli.command else {
            panic!("expected backup-partial");
        };
        let request = args.into_request();
        let include = request.include.unwrap();
        assert_eq!(include.addons, vec!["core_ssh"]);
        assert_eq!(include.folders, vec!["config"]);
        assert_eq!(request.keep_days, Some(3.0));
        assert!(request.exclude.is_none());
    }

    #[test]
    fn test_backup_full_args_become_exclude_block() {
        let cli = Cli::try_parse_from([
            "autobackup",
            "backup-full",
            "--exclude-addon",
            "Node-RED",
            "--uncompressed",
        ])
        .unwrap();

        let Commands::BackupFull(args) = cli.command else {
            panic!("expected backup-full");
        };
        let request = args.into_request();
        assert_eq!(request.exclude.unwrap().addons, vec!["Node-RED"]);
        assert!(request.include.is_none());
        assert!(!request.compressed);
    }

    #[test]
    fn test_plain_backup_with_no_selection_is_full() {
        let cli = Cli::try_parse_from(["autobackup", "backup", "--name", "Nightly"]).unwrap();

        let Commands::Backup(args) = cli.command else {
            panic!("expected backup");
        };
        let request = args.into_request();
        assert!(request.is_full());
        assert_eq!(request.name.as_deref(), Some("Nightly"));
    }

    #[test]
    fn test_global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from(["autobackup", "--verbose", "purge"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Purge));
    }
}
