//! Configuration schema types
//!
//! This module defines the configuration structure for Replica.

use crate::anonymization::AnonymizationConfig;
use crate::domain::{Environment, EnvironmentType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Main Replica configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplicaConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Masking rules and audit settings
    #[serde(default)]
    pub anonymization: AnonymizationConfig,

    /// Clone pipeline settings
    #[serde(default)]
    pub clone: CloneConfig,

    /// Environments that clones may read from or write to
    #[serde(default)]
    pub environments: Vec<EnvironmentConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ReplicaConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.anonymization
            .validate()
            .map_err(|e| format!("anonymization: {e:#}"))?;
        self.clone.validate()?;

        let mut seen = HashSet::new();
        for environment in &self.environments {
            environment.to_environment()?;
            if !seen.insert(environment.id.as_str()) {
                return Err(format!("Duplicate environment id '{}'", environment.id));
            }
        }

        self.logging.validate()?;
        Ok(())
    }

    /// Builds the environment declared with an id
    pub fn environment(&self, id: &str) -> Result<Environment, String> {
        self.environments
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| format!("Unknown environment '{id}'"))?
            .to_environment()
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Dry run mode (plan clones without writing to the target)
    #[serde(default)]
    pub dry_run: bool,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            dry_run: false,
        }
    }
}

/// Clone pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneConfig {
    /// Anonymize data by default
    #[serde(default = "default_true")]
    pub anonymize: bool,

    /// Mapping checkpoint settings
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
}

impl CloneConfig {
    fn validate(&self) -> Result<(), String> {
        if self.checkpoint.enabled && self.checkpoint.directory.as_os_str().is_empty() {
            return Err("clone.checkpoint.directory cannot be empty when checkpoints are enabled".to_string());
        }
        Ok(())
    }
}

impl Default for CloneConfig {
    fn default() -> Self {
        Self {
            anonymize: true,
            checkpoint: CheckpointConfig::default(),
        }
    }
}

/// Mapping checkpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Save mapping snapshots after each data phase
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding one JSON file per checkpoint key
    #[serde(default = "default_checkpoint_directory")]
    pub directory: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_checkpoint_directory(),
        }
    }
}

/// A declared environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(rename = "type")]
    pub environment_type: EnvironmentType,

    /// Overrides the write flag; production is always read-only
    #[serde(default)]
    pub allow_writes: Option<bool>,
}

impl EnvironmentConfig {
    /// Builds the domain environment
    pub fn to_environment(&self) -> Result<Environment, String> {
        let name = self.name.clone().unwrap_or_else(|| self.id.clone());
        let environment = Environment::new(self.id.clone(), name, self.environment_type)?;
        match self.allow_writes {
            Some(true) if environment.is_production => Err(format!(
                "Environment '{}' is production and cannot allow writes",
                self.id
            )),
            Some(allow) => Ok(environment.with_writes(allow)),
            None => Ok(environment),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        if self.local_enabled && self.local_path.trim().is_empty() {
            return Err("logging.local_path cannot be empty when file logging is enabled".to_string());
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_checkpoint_directory() -> PathBuf {
    PathBuf::from("./checkpoints")
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_config_validation() {
        let mut config = ApplicationConfig {
            log_level: "info".to_string(),
            dry_run: false,
        };

        assert!(config.validate().is_ok());

        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ReplicaConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.clone.anonymize);
        assert!(config.clone.checkpoint.enabled);
    }

    #[test]
    fn test_logging_config_validation() {
        let mut config = LoggingConfig::default();
        assert!(config.validate().is_ok());

        config.local_rotation = "size".to_string();
        assert!(config.validate().is_err());

        config.local_rotation = "hourly".to_string();
        config.local_path = " ".to_string();
        assert!(config.validate().is_err());

        config.local_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_lookup() {
        let config: ReplicaConfig = toml::from_str(
            r#"
[[environments]]
id = "prod"
type = "production"

[[environments]]
id = "staging"
name = "Staging"
type = "staging"
allow_writes = false
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        let prod = config.environment("prod").unwrap();
        assert!(prod.is_production);
        assert!(!prod.allow_writes);
        assert_eq!(prod.name, "prod");

        let staging = config.environment("staging").unwrap();
        assert!(!staging.allow_writes);

        assert!(config.environment("qa").is_err());
    }

    #[test]
    fn test_writable_production_rejected() {
        let env = EnvironmentConfig {
            id: "prod".to_string(),
            name: None,
            environment_type: EnvironmentType::Production,
            allow_writes: Some(true),
        };
        assert!(env.to_environment().is_err());
    }

    #[test]
    fn test_duplicate_environment_rejected() {
        let env = EnvironmentConfig {
            id: "dev".to_string(),
            name: None,
            environment_type: EnvironmentType::Development,
            allow_writes: None,
        };
        let config = ReplicaConfig {
            environments: vec![env.clone(), env],
            ..ReplicaConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
