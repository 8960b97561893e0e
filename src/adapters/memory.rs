//! In-memory backend
//!
//! Keeps rows, executed statements and checkpoints per environment in process
//! memory. Failures can be injected per table or statement, which is how the
//! clone pipeline's partial-failure behavior is exercised in tests.

use crate::adapters::traits::{CheckpointStorage, RowAccess, SqlExecutor, SqlGenerator, SqlStatement};
use crate::anonymization::MappingSnapshot;
use crate::core::subsystem::SubsystemKind;
use crate::domain::{BackendError, Environment, Row, TableDescriptor};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Failure points that can be injected into an [`InMemoryBackend`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InjectedFailure {
    /// Fetching the named table fails
    Fetch(String),
    /// Inserting into the named table fails
    Insert(String),
    /// Executing the named statement fails
    Execute(String),
    /// Every checkpoint load/save fails
    Checkpoint,
}

/// Rows, statements and checkpoints held in memory
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    tables: Mutex<HashMap<(String, String), Vec<Row>>>,
    executed: Mutex<Vec<(String, String)>>,
    checkpoints: Mutex<HashMap<String, MappingSnapshot>>,
    failures: Mutex<HashSet<InjectedFailure>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the rows of a table in an environment
    pub fn seed(&self, environment: &Environment, table: &str, rows: Vec<Row>) {
        lock(&self.tables).insert((environment.id.to_string(), table.to_string()), rows);
    }

    /// Rows currently stored for a table
    pub fn rows(&self, environment: &Environment, table: &str) -> Vec<Row> {
        lock(&self.tables)
            .get(&(environment.id.to_string(), table.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    /// Names of statements executed against an environment, in order
    pub fn executed_statements(&self, environment: &Environment) -> Vec<String> {
        lock(&self.executed)
            .iter()
            .filter(|(env, _)| env == environment.id.as_str())
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Stored checkpoint keys
    pub fn checkpoint_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.checkpoints).keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Makes a later operation fail
    pub fn inject(&self, failure: InjectedFailure) {
        lock(&self.failures).insert(failure);
    }

    /// Removes all injected failures
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    fn fails(&self, failure: &InjectedFailure) -> bool {
        lock(&self.failures).contains(failure)
    }
}

/// Parses a `column = value` filter
fn parse_filter(filter: &str) -> Option<(&str, &str)> {
    let (column, value) = filter.split_once('=')?;
    let column = column.trim();
    let value = value.trim().trim_matches('\'');
    (!column.is_empty()).then_some((column, value))
}

#[async_trait]
impl RowAccess for InMemoryBackend {
    async fn fetch_rows(
        &self,
        environment: &Environment,
        table: &TableDescriptor,
        filter: Option<&str>,
    ) -> Result<Vec<Row>, BackendError> {
        if self.fails(&InjectedFailure::Fetch(table.name.clone())) {
            return Err(BackendError::FetchFailed {
                table: table.name.clone(),
                message: "injected failure".to_string(),
            });
        }

        let rows = self.rows(environment, &table.name);
        let Some(filter) = filter else {
            return Ok(rows);
        };

        let (column, value) = parse_filter(filter).ok_or_else(|| BackendError::FetchFailed {
            table: table.name.clone(),
            message: format!("unsupported filter '{filter}'"),
        })?;
        let index = table
            .column_index(column)
            .ok_or_else(|| BackendError::FetchFailed {
                table: table.name.clone(),
                message: format!("unknown filter column '{column}'"),
            })?;

        Ok(rows
            .into_iter()
            .filter(|row| {
                row.get(index)
                    .and_then(|v| v.canonical_key())
                    .is_some_and(|key| key == value)
            })
            .collect())
    }

    async fn insert_rows(
        &self,
        environment: &Environment,
        table: &TableDescriptor,
        rows: Vec<Row>,
    ) -> Result<usize, BackendError> {
        if self.fails(&InjectedFailure::Insert(table.name.clone())) {
            return Err(BackendError::InsertFailed {
                table: table.name.clone(),
                message: "injected failure".to_string(),
            });
        }
        if let Some(row) = rows.iter().find(|r| r.len() != table.columns.len()) {
            return Err(BackendError::InsertFailed {
                table: table.name.clone(),
                message: format!(
                    "row has {} values, table has {} columns",
                    row.len(),
                    table.columns.len()
                ),
            });
        }

        let count = rows.len();
        lock(&self.tables)
            .entry((environment.id.to_string(), table.name.clone()))
            .or_default()
            .extend(rows);
        Ok(count)
    }
}

#[async_trait]
impl SqlExecutor for InMemoryBackend {
    async fn execute(
        &self,
        environment: &Environment,
        statement: &SqlStatement,
    ) -> Result<(), BackendError> {
        if self.fails(&InjectedFailure::Execute(statement.name.clone())) {
            return Err(BackendError::ExecuteFailed {
                statement: statement.name.clone(),
                message: "injected failure".to_string(),
            });
        }
        lock(&self.executed).push((environment.id.to_string(), statement.name.clone()));
        Ok(())
    }
}

#[async_trait]
impl CheckpointStorage for InMemoryBackend {
    async fn load(&self, key: &str) -> Result<Option<MappingSnapshot>, BackendError> {
        if self.fails(&InjectedFailure::Checkpoint) {
            return Err(BackendError::CheckpointFailed("injected failure".to_string()));
        }
        Ok(lock(&self.checkpoints).get(key).cloned())
    }

    async fn save(&self, key: &str, snapshot: &MappingSnapshot) -> Result<(), BackendError> {
        if self.fails(&InjectedFailure::Checkpoint) {
            return Err(BackendError::CheckpointFailed("injected failure".to_string()));
        }
        lock(&self.checkpoints).insert(key.to_string(), snapshot.clone());
        Ok(())
    }
}

/// Phase of generated DDL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Schema,
    Function,
    Trigger,
}

/// A [`SqlGenerator`] serving statements registered up front
#[derive(Debug, Clone, Default)]
pub struct StatementCatalog {
    statements: HashMap<(SubsystemKind, StatementKind), Vec<SqlStatement>>,
}

impl StatementCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a statement
    pub fn with(mut self, subsystem: SubsystemKind, kind: StatementKind, statement: SqlStatement) -> Self {
        self.statements
            .entry((subsystem, kind))
            .or_default()
            .push(statement);
        self
    }

    fn get(&self, subsystem: SubsystemKind, kind: StatementKind) -> Vec<SqlStatement> {
        self.statements
            .get(&(subsystem, kind))
            .cloned()
            .unwrap_or_default()
    }
}

impl SqlGenerator for StatementCatalog {
    fn schema_statements(&self, subsystem: SubsystemKind) -> Vec<SqlStatement> {
        self.get(subsystem, StatementKind::Schema)
    }

    fn function_statements(&self, subsystem: SubsystemKind) -> Vec<SqlStatement> {
        self.get(subsystem, StatementKind::Function)
    }

    fn trigger_statements(&self, subsystem: SubsystemKind) -> Vec<SqlStatement> {
        self.get(subsystem, StatementKind::Trigger)
    }
}
