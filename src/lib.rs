//! autobackup - expiring backup manager for Home Assistant installations
//!
//! Creates full or partial backups through a provider backend, tags each backup
//! with an optional expiry, and purges backups whose expiry has passed.
//!
//! The moving parts:
//! - [`selector`] resolves symbolic include/exclude specifications into the
//!   slug and folder-id sets the provider understands
//! - [`manager`] drives a creation request end-to-end and runs the expiry sweep
//! - [`providers`] abstracts the backup backend behind one trait
//! - [`store`] persists the expiry mapping as a single versioned JSON document
//! - [`events`] fan out lifecycle results to subscribers

pub mod config;
pub mod events;
pub mod manager;
pub mod providers;
pub mod request;
pub mod selector;
pub mod store;
