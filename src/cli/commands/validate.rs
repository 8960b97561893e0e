//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Replica configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates before returning
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Anonymize Clones: {}", config.clone.anonymize);
        println!("  Masking Strategy: {:?}", config.anonymization.strategy);
        println!("  Masking Rules: {}", config.anonymization.rules.len());
        println!(
            "  Checkpoints: {}",
            if config.clone.checkpoint.enabled {
                config.clone.checkpoint.directory.display().to_string()
            } else {
                "disabled".to_string()
            }
        );
        for environment in &config.environments {
            println!(
                "  Environment: {} ({:?})",
                environment.id, environment.environment_type
            );
        }
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_invalid_config_exit_code() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[logging]\nlocal_rotation = \"weekly\"\n").unwrap();
        let code = ValidateArgs {}
            .execute(file.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(code, 2);
    }
}
