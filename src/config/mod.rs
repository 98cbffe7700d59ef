//! Configuration loading and schema
//!
//! Configuration is layered: config file first, then environment variables.
//! The schema lives in `schema.rs`, the layering logic in `loader.rs`.

pub mod loader;
pub mod schema;

pub use loader::{ConfigError, default_store_path, get_default_config_path, load_config};
pub use schema::Config;
