//! CLI command implementations
//!
//! Exit codes: 0 success, 1 partial failure or integrity errors,
//! 2 configuration error, 3 blocked by the safety guard, 5 fatal error.

pub mod anonymize;
pub mod clone;
pub mod init;
pub mod plan;
pub mod validate;
pub mod verify;

use crate::config::{load_config, ReplicaConfig};
use crate::domain::Result;
use std::path::Path;

/// Loads the configuration file, or defaults when it does not exist
pub(crate) fn load_or_default(config_path: &str) -> Result<ReplicaConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::info!(config_path, "Configuration file not found, using defaults");
        Ok(ReplicaConfig::default())
    }
}
