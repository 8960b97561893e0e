//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "replica.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Replica configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Declare your environments in {}", self.output);
                println!("  2. Add masking rules for columns that need them");
                println!("  3. Validate configuration: replica validate-config");
                println!("  4. Rehearse a clone: replica clone --subsystem billing --source prod --target dev --input prod.json");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5)
            }
        }
    }

    /// Generate the sample configuration
    fn generate_config() -> String {
        r#"# Replica Configuration File
# Environment cloning with deterministic anonymization

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# Plan clones without writing to the target
dry_run = false

[anonymization]
# Default strategy for sensitive columns: deterministic | redact
strategy = "deterministic"

# Mask undeclared *_id columns through a per-column fallback mapping
mask_undeclared_references = true

# Maximum timestamp shift in days
timestamp_window_days = 30

# Per-column overrides
# [[anonymization.rules]]
# table = "users"
# column = "phone"
# strategy = "redact"

[anonymization.audit]
enabled = false
log_path = "./audit/anonymization.log"
json_format = true

[clone]
# Anonymize data by default
anonymize = true

[clone.checkpoint]
# Save mapping snapshots so retried clones keep identifiers stable
enabled = true
directory = "./checkpoints"

[[environments]]
id = "prod"
name = "Production"
type = "production"

[[environments]]
id = "staging"
name = "Staging"
type = "staging"

[[environments]]
id = "dev"
name = "Development"
type = "development"

[logging]
local_enabled = true
local_path = "./logs"
# daily | hourly | never
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_generated_config_is_valid() {
        let config = parse_config(&InitArgs::generate_config()).unwrap();
        assert_eq!(config.environments.len(), 3);
        assert!(config.environment("prod").unwrap().is_production);
    }

    #[tokio::test]
    async fn test_existing_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replica.toml");
        std::fs::write(&path, "# mine").unwrap();

        let args = InitArgs {
            output: path.to_string_lossy().to_string(),
            force: false,
        };
        assert_eq!(args.execute().await.unwrap(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine");
    }
}
