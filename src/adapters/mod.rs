//! External system integrations for Replica.
//!
//! This module defines the collaborator traits the clone pipeline depends on
//! and provides reference implementations:
//!
//! - [`traits`] - `SafetyGuard`, `RowAccess`, `SqlExecutor`, `SqlGenerator`, `CheckpointStorage`
//! - [`memory`] - In-memory rows, statements and checkpoints with failure injection
//! - [`file`] - JSON dataset/snapshot files and file-backed checkpoints
//! - [`safety`] - Guard driven by environment flags
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external systems and
//! enable testing with in-memory implementations. Collaborators are injected as
//! trait objects; there are no global singletons.
//!
//! ```rust
//! use replica::adapters::memory::InMemoryBackend;
//! use replica::adapters::traits::RowAccess;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(InMemoryBackend::new());
//! let rows: Arc<dyn RowAccess + Send + Sync> = backend.clone();
//! # let _ = rows;
//! ```

pub mod file;
pub mod memory;
pub mod safety;
pub mod traits;

pub use file::JsonFileCheckpointStorage;
pub use memory::{InMemoryBackend, InjectedFailure, StatementCatalog, StatementKind};
pub use safety::EnvironmentFlagGuard;
pub use traits::{CheckpointStorage, RowAccess, SafetyGuard, SqlExecutor, SqlGenerator, SqlStatement};
