//! Anonymize command implementation
//!
//! This module implements the `anonymize` command, which masks a JSON dataset
//! file and optionally reuses and saves mapping snapshots.

use crate::adapters::file::{read_dataset, read_snapshot, write_dataset, write_snapshot};
use crate::anonymization::{AnonymizationEngine, MappingStore};
use crate::cli::commands::load_or_default;
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the anonymize command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    /// Dataset JSON file to mask
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the masked dataset
    #[arg(short, long)]
    pub output: PathBuf,

    /// Mapping snapshot from an earlier run to reuse
    #[arg(long)]
    pub mappings_in: Option<PathBuf>,

    /// Where to write the mapping snapshot after this run
    #[arg(long)]
    pub mappings_out: Option<PathBuf>,

    /// Where to write the anonymization report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report what would be masked without writing the output
    #[arg(long)]
    pub dry_run: bool,
}

impl AnonymizeArgs {
    /// Execute the anonymize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Starting anonymize command");

        let mut config = match load_or_default(config_path) {
            Ok(config) => config.anonymization,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };
        config.enabled = true;
        if self.dry_run {
            config.dry_run = true;
        }

        let dataset = read_dataset(&self.input)
            .with_context(|| format!("Failed to load dataset {}", self.input.display()))?;

        let store = match &self.mappings_in {
            Some(path) => MappingStore::from_snapshot(read_snapshot(path)?)
                .with_context(|| format!("Failed to import mappings {}", path.display()))?,
            None => MappingStore::new(),
        };

        let engine = match AnonymizationEngine::new(config) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let outcome = engine.process(dataset, store)?;
        println!("{}", outcome.report.format_console());

        if let Some(path) = &self.report {
            outcome
                .report
                .write_to_file(path)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
        }

        if engine.is_dry_run() {
            println!("🔍 DRY RUN MODE - {} was not written", self.output.display());
            return Ok(0);
        }

        write_dataset(&self.output, &outcome.dataset)?;
        println!("✅ Masked dataset written to {}", self.output.display());

        if let Some(path) = &self.mappings_out {
            write_snapshot(path, &outcome.store.export())?;
            println!("✅ Mapping snapshot written to {}", path.display());
        }

        Ok(0)
    }
}
