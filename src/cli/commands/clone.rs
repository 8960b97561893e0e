//! Clone command implementation
//!
//! This module implements the `clone` command. It rehearses a subsystem clone
//! in process: the source environment is seeded from a JSON dataset file, the
//! pipeline runs against in-memory storage, and the resulting target tables are
//! written back out as JSON. Mapping checkpoints go to the configured
//! checkpoint directory, so repeated rehearsals keep identifiers stable.

use crate::adapters::file::{read_dataset, read_snapshot, write_dataset};
use crate::adapters::memory::{InMemoryBackend, StatementCatalog};
use crate::adapters::safety::EnvironmentFlagGuard;
use crate::adapters::JsonFileCheckpointStorage;
use crate::cli::commands::load_or_default;
use crate::core::clone::{CloneOptions, ClonePipeline};
use crate::core::state::CheckpointManager;
use crate::core::subsystem::{SubsystemDescriptor, SubsystemKind};
use crate::domain::{ColumnValue, Environment, RelationalDataset, Row};
use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the clone command
#[derive(Args, Debug)]
pub struct CloneArgs {
    /// Subsystem to clone (audit-trail, conversations, reservations, billing)
    #[arg(short, long)]
    pub subsystem: SubsystemKind,

    /// Source environment id, as declared in the configuration
    #[arg(long)]
    pub source: String,

    /// Target environment id, as declared in the configuration
    #[arg(long)]
    pub target: String,

    /// Dataset JSON file holding the source environment's rows
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the target environment's rows after the clone
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Filter applied to every fetched table (`column = 'value'`)
    #[arg(long)]
    pub row_filter: Option<String>,

    /// Mapping snapshot to reuse
    #[arg(long)]
    pub mappings_in: Option<PathBuf>,

    /// Reuse the stored checkpoint for this subsystem and environment pair
    #[arg(long)]
    pub resume: bool,

    /// Copy data without masking it
    #[arg(long)]
    pub no_anonymize: bool,

    /// Plan the clone without writing to the target
    #[arg(long)]
    pub dry_run: bool,
}

impl CloneArgs {
    /// Execute the clone command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(subsystem = %self.subsystem, "Starting clone command");

        let config = match load_or_default(config_path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let (source, target) = match (config.environment(&self.source), config.environment(&self.target)) {
            (Ok(source), Ok(target)) => (source, target),
            (Err(e), _) | (_, Err(e)) => {
                eprintln!("Configuration error: {e}");
                return Ok(2);
            }
        };

        let descriptor = self.subsystem.descriptor();
        let dataset = read_dataset(&self.input)
            .with_context(|| format!("Failed to load dataset {}", self.input.display()))?;

        let backend = Arc::new(InMemoryBackend::new());
        seed_environment(&backend, &source, &descriptor, &dataset);

        let mut pipeline = ClonePipeline::new(
            Arc::new(EnvironmentFlagGuard::new()),
            backend.clone(),
            backend.clone(),
            Arc::new(StatementCatalog::new()),
        )
        .with_anonymization(config.anonymization.clone())
        .with_shutdown(shutdown_signal);

        if config.clone.checkpoint.enabled {
            let storage = JsonFileCheckpointStorage::new(config.clone.checkpoint.directory.clone());
            pipeline = pipeline.with_checkpoints(CheckpointManager::new_with_storage(Arc::new(storage)));
        }

        let mut options = CloneOptions::new(self.subsystem, source, target.clone())
            .with_anonymize(config.clone.anonymize && !self.no_anonymize);
        if let Some(filter) = &self.row_filter {
            options = options.with_row_filter(filter.clone());
        }
        if let Some(path) = &self.mappings_in {
            options = options.with_mapping_snapshot(read_snapshot(path)?);
        }
        if self.resume {
            options = options.resuming();
        }
        if self.dry_run || config.application.dry_run {
            println!("🔍 DRY RUN MODE - No data will be written to {}", target.id);
            options = options.dry_run();
        }

        let operation = match pipeline.run(&options).await {
            Ok(operation) => operation,
            Err(e) => {
                eprintln!("Invalid clone request: {e}");
                return Ok(2);
            }
        };

        println!("{}", operation.format_console());

        if let Some(path) = &self.output {
            let mut cloned = RelationalDataset::new();
            for table in &descriptor.tables {
                cloned.add_table(table.clone(), backend.rows(&target, &table.name));
            }
            write_dataset(path, &cloned)?;
            println!("✅ Target tables written to {}", path.display());
        }

        if operation.has_safety_error() {
            Ok(3)
        } else if operation.success {
            Ok(0)
        } else {
            Ok(1)
        }
    }
}

/// Seeds the source environment, aligning input columns by name
fn seed_environment(
    backend: &InMemoryBackend,
    source: &Environment,
    descriptor: &SubsystemDescriptor,
    dataset: &RelationalDataset,
) {
    for table in &descriptor.tables {
        let Some(input) = dataset.table(&table.name) else {
            tracing::warn!(table = %table.name, "Input dataset has no rows for table");
            continue;
        };
        let indexes: Vec<Option<usize>> = table
            .columns
            .iter()
            .map(|c| input.descriptor.column_index(&c.name))
            .collect();
        let rows = input
            .rows
            .iter()
            .map(|row| {
                Row::new(
                    indexes
                        .iter()
                        .map(|index| {
                            index
                                .and_then(|i| row.get(i).cloned())
                                .unwrap_or(ColumnValue::Null)
                        })
                        .collect(),
                )
            })
            .collect();
        backend.seed(source, &table.name, rows);
    }
}
