//! Collaborator traits
//!
//! These traits define the boundary between the clone pipeline and the systems
//! it drives. Implementations are injected as `Arc<dyn Trait + Send + Sync>`.

use crate::anonymization::MappingSnapshot;
use crate::core::subsystem::SubsystemKind;
use crate::domain::{BackendError, Environment, Row, SafetyError, TableDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A named SQL statement produced by a [`SqlGenerator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlStatement {
    pub name: String,
    pub sql: String,
}

impl SqlStatement {
    /// Create a named statement
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// Production-safety guard
///
/// Every error returned here is fatal for the clone that triggered it.
#[async_trait]
pub trait SafetyGuard: Send + Sync {
    /// Checks that an environment may be read as a clone source
    async fn validate_clone_source(&self, environment: &Environment) -> Result<(), SafetyError>;

    /// Checks that an environment may receive a clone
    async fn validate_clone_target(&self, environment: &Environment) -> Result<(), SafetyError>;

    /// Checks a specific write operation right before it happens
    async fn enforce_read_only_access(
        &self,
        environment: &Environment,
        operation: &str,
    ) -> Result<(), SafetyError>;
}

/// Row-level data access
#[async_trait]
pub trait RowAccess: Send + Sync {
    /// Fetches rows of a table, optionally restricted by a filter expression
    ///
    /// Returned rows must be aligned with the descriptor's columns.
    async fn fetch_rows(
        &self,
        environment: &Environment,
        table: &TableDescriptor,
        filter: Option<&str>,
    ) -> Result<Vec<Row>, BackendError>;

    /// Inserts rows into a table, returning the number written
    async fn insert_rows(
        &self,
        environment: &Environment,
        table: &TableDescriptor,
        rows: Vec<Row>,
    ) -> Result<usize, BackendError>;
}

/// Executes statements against an environment
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Executes one statement
    async fn execute(
        &self,
        environment: &Environment,
        statement: &SqlStatement,
    ) -> Result<(), BackendError>;
}

/// Produces the DDL for a subsystem
pub trait SqlGenerator: Send + Sync {
    /// Table and index definitions
    fn schema_statements(&self, subsystem: SubsystemKind) -> Vec<SqlStatement>;

    /// Stored function definitions
    fn function_statements(&self, subsystem: SubsystemKind) -> Vec<SqlStatement>;

    /// Trigger definitions
    fn trigger_statements(&self, subsystem: SubsystemKind) -> Vec<SqlStatement>;
}

/// Persistence for mapping snapshots
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Loads the snapshot stored under a key
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if no checkpoint exists for the key.
    async fn load(&self, key: &str) -> Result<Option<MappingSnapshot>, BackendError>;

    /// Stores a snapshot under a key, replacing any previous one
    async fn save(&self, key: &str, snapshot: &MappingSnapshot) -> Result<(), BackendError>;
}
