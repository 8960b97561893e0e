//! Configuration management for Replica.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Replica uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `REPLICA_*` environment overrides
//! - Default values for every section
//! - Validation with descriptive errors
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use replica::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("replica.toml")?;
//!
//! println!("Log level: {}", config.application.log_level);
//! println!("Checkpoints: {}", config.clone.checkpoint.directory.display());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level and dry-run default
//! - [`AnonymizationConfig`](crate::anonymization::AnonymizationConfig) - Strategy, rules and audit log
//! - [`CloneConfig`] - Anonymization default and mapping checkpoints
//! - [`EnvironmentConfig`] - Declared source and target environments
//! - [`LoggingConfig`] - Local JSON log files
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [anonymization]
//! strategy = "deterministic"
//! timestamp_window_days = 30
//!
//! [[anonymization.rules]]
//! table = "users"
//! column = "phone"
//! strategy = "redact"
//!
//! [clone.checkpoint]
//! enabled = true
//! directory = "${REPLICA_STATE_DIR}/checkpoints"
//!
//! [[environments]]
//! id = "prod"
//! type = "production"
//!
//! [[environments]]
//! id = "dev"
//! type = "development"
//! ```

pub mod loader;
pub mod schema;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, CheckpointConfig, CloneConfig, EnvironmentConfig, LoggingConfig,
    ReplicaConfig,
};
