//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Replica using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Replica - environment cloning with deterministic anonymization
#[derive(Parser, Debug)]
#[command(name = "replica")]
#[command(version, about, long_about = None)]
#[command(author = "Replica Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "replica.toml", env = "REPLICA_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "REPLICA_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mask a JSON dataset file
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Rehearse a subsystem clone from a JSON dataset file
    Clone(commands::clone::CloneArgs),

    /// Check the foreign keys of a JSON dataset file
    Verify(commands::verify::VerifyArgs),

    /// Show the table processing order of a JSON dataset file
    Plan(commands::plan::PlanArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::subsystem::SubsystemKind;

    #[test]
    fn test_cli_parse_anonymize() {
        let cli = Cli::parse_from([
            "replica",
            "anonymize",
            "--input",
            "prod.json",
            "--output",
            "masked.json",
            "--mappings-out",
            "mappings.json",
        ]);
        assert_eq!(cli.config, "replica.toml");
        match cli.command {
            Commands::Anonymize(args) => {
                assert_eq!(args.input.to_str(), Some("prod.json"));
                assert!(args.mappings_in.is_none());
                assert!(args.mappings_out.is_some());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_clone() {
        let cli = Cli::parse_from([
            "replica",
            "clone",
            "--subsystem",
            "audit-trail",
            "--source",
            "prod",
            "--target",
            "dev",
            "--input",
            "prod.json",
            "--resume",
        ]);
        match cli.command {
            Commands::Clone(args) => {
                assert_eq!(args.subsystem, SubsystemKind::AuditTrail);
                assert!(args.resume);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["replica", "--config", "custom.toml", "verify", "-i", "a.json"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Verify(_)));
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["replica", "--log-level", "debug", "plan", "--input", "a.json"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["replica", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["replica", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }
}
