//! Configuration management for slowmo
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use slowmo::config::Config;
//!
//! let config = Config::load(None).expect("Failed to load configuration");
//! println!("Snapshots stored in: {}", config.snapshots.dir.display());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SLOWMO__<section>__<key>`
//!
//! Examples:
//! - `SLOWMO__SNAPSHOTS__DIR=/var/lib/slowmo`
//! - `SLOWMO__SCHEDULER__MAX_THREADS=8`
//! - `SLOWMO__SCHEDULER__POLLING_INTERVAL=5m`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/slowmo.toml`.
//! This can be overridden with `--config` or the `SLOWMO_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

pub use crate::humanize::HumanDuration;
pub use models::{Config, RequestConfig, SchedulerConfig, SnapshotConfig, VcsConfig};
pub use validation::ValidationError;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`SLOWMO__*`)
    /// 2. TOML file (`explicit`, else `SLOWMO_CONFIG`, else `config/slowmo.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - Validation fails (no worker slots, zero timeout, etc.)
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let config = sources::load(explicit)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
