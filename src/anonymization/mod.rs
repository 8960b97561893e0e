//! Relationship-preserving anonymization
//!
//! This module masks relational datasets for non-production environments. The
//! same source value under the same `table.column` context always masks to the
//! same value, and every foreign key in the masked copy still resolves to its
//! identically masked parent.
//!
//! # Architecture
//!
//! The pipeline consists of:
//! - **Masker**: deterministic, type-preserving value masking
//! - **Mapping store**: per-column bijections shared by references
//! - **Graph resolver**: dependency-respecting table order
//! - **Strategies**: masking of sensitive non-key columns
//! - **Validator**: referential integrity checks
//! - **Audit**: structured logging with hashed source values
//!
//! # Usage
//!
//! ```rust,ignore
//! use replica::anonymization::{AnonymizationEngine, AnonymizationConfig, MappingStore};
//!
//! let engine = AnonymizationEngine::new(AnonymizationConfig::default())?;
//! let outcome = engine.process(dataset, MappingStore::new())?;
//! ```

pub mod audit;
pub mod config;
pub mod engine;
pub mod graph;
pub mod mapping;
pub mod masker;
pub mod report;
pub mod strategy;
pub mod validator;

// Re-export main types
pub use config::AnonymizationConfig;
pub use engine::{AnonymizationEngine, AnonymizationOutcome};
pub use graph::ProcessingOrder;
pub use mapping::{MappingSnapshot, MappingStore, Resolution};
pub use masker::{is_uuid, mask, DeterministicMasker};
pub use report::AnonymizationReport;
pub use validator::{validate, IntegrityReport, IntegrityViolation};
