//! Core business logic for Replica.
//!
//! This module contains the orchestration for subsystem clones.
//!
//! # Modules
//!
//! - [`clone`] - Clone pipeline, options, phases and operation records
//! - [`state`] - Mapping checkpoints so retried clones keep identifiers stable
//! - [`subsystem`] - Table layouts of the cloneable subsystems
//!
//! # Clone Workflow
//!
//! 1. **Prepare**: Validate source and target with the safety guard, load mappings
//! 2. **Schema / Functions / Triggers**: Execute generated statements on the target
//! 3. **Data**: Fetch rows, anonymize, insert in dependency order
//! 4. **Checkpoint**: Save the mapping snapshot
//! 5. **Validate**: Check every foreign key on the target
//!
//! # Example
//!
//! ```rust,no_run
//! use replica::adapters::memory::{InMemoryBackend, StatementCatalog};
//! use replica::adapters::safety::EnvironmentFlagGuard;
//! use replica::core::clone::{CloneOptions, ClonePipeline};
//! use replica::core::subsystem::SubsystemKind;
//! use replica::domain::{Environment, EnvironmentType};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(InMemoryBackend::new());
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let pipeline = ClonePipeline::new(
//!     Arc::new(EnvironmentFlagGuard::new()),
//!     backend.clone(),
//!     backend.clone(),
//!     Arc::new(StatementCatalog::new()),
//! )
//! .with_shutdown(shutdown_rx);
//!
//! let source = Environment::new("prod", "Production", EnvironmentType::Production)?;
//! let target = Environment::new("dev", "Development", EnvironmentType::Development)?;
//! let operation = pipeline
//!     .run(&CloneOptions::new(SubsystemKind::Reservations, source, target))
//!     .await?;
//!
//! println!("Rows cloned: {}", operation.rows_cloned());
//! # Ok(())
//! # }
//! ```

pub mod clone;
pub mod state;
pub mod subsystem;
