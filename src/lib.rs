// Replica - Environment cloning with deterministic anonymization
// Copyright (c) 2025 Replica Contributors
// Licensed under the MIT License

//! # Replica - Environment Cloning with Deterministic Anonymization
//!
//! Replica copies the schema, functions, triggers and data of an application
//! subsystem from one environment into another. On the way, personal data is
//! replaced with realistic, deterministic fake values while every foreign key
//! keeps pointing at the right row.
//!
//! ## Overview
//!
//! This library provides:
//! - **Masking** values deterministically, preserving type, shape and magnitude
//! - **Mapping** original identifiers to masked ones, with snapshots for reuse
//! - **Ordering** tables so referenced tables are processed first
//! - **Validating** referential integrity after masking
//! - **Orchestrating** phased clones with production-safety checks
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Clone pipeline, mapping checkpoints and subsystem layouts
//! - [`anonymization`] - Masker, mapping store, graph order, engine and validator
//! - [`adapters`] - Collaborator traits with in-memory and file implementations
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use replica::anonymization::{AnonymizationConfig, AnonymizationEngine, MappingStore};
//! use replica::domain::{ColumnDescriptor, ColumnType, RelationalDataset, Row, TableDescriptor};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let users = TableDescriptor::new("users")
//!     .column(ColumnDescriptor::primary_key("id", ColumnType::Text))
//!     .column(ColumnDescriptor::new("email", ColumnType::Text).sensitive());
//! let bookings = TableDescriptor::new("bookings")
//!     .column(ColumnDescriptor::primary_key("id", ColumnType::Text))
//!     .column(ColumnDescriptor::new("user_id", ColumnType::Text))
//!     .foreign_key("user_id", "users", "id");
//!
//! let dataset = RelationalDataset::new()
//!     .with_table(users, vec![Row::new(vec!["u1".into(), "ada@example.com".into()])])
//!     .with_table(bookings, vec![Row::new(vec!["b1".into(), "u1".into()])]);
//!
//! let engine = AnonymizationEngine::new(AnonymizationConfig::default())?;
//! let outcome = engine.process(dataset, MappingStore::new())?;
//!
//! let user_id = outcome.dataset.table("users").unwrap().rows[0].get(0).cloned();
//! let booking_user = outcome.dataset.table("bookings").unwrap().rows[0].get(1).cloned();
//! assert_eq!(user_id, booking_user);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library operations return [`domain::Result`] with a [`domain::ReplicaError`].
//! Safety violations keep their own [`domain::SafetyError`] type so callers
//! can never mistake them for transient failures.

pub mod adapters;
pub mod anonymization;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
