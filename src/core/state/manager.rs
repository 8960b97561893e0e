//! Checkpoint manager for mapping snapshots
//!
//! This module provides the CheckpointManager for loading and saving the
//! mapping snapshot of a clone, so a retried clone keeps masked identifiers
//! stable.

use crate::adapters::traits::CheckpointStorage;
use crate::anonymization::MappingSnapshot;
use crate::core::subsystem::SubsystemKind;
use crate::domain::{Environment, Result};
use std::sync::Arc;

/// Builds the checkpoint key for a subsystem clone between two environments
///
/// # Examples
///
/// ```
/// use replica::core::state::checkpoint_key;
/// use replica::core::subsystem::SubsystemKind;
/// use replica::domain::{Environment, EnvironmentType};
///
/// let prod = Environment::new("prod", "Production", EnvironmentType::Production).unwrap();
/// let dev = Environment::new("dev", "Dev", EnvironmentType::Development).unwrap();
/// assert_eq!(checkpoint_key(SubsystemKind::Billing, &prod, &dev), "billing:prod->dev");
/// ```
pub fn checkpoint_key(subsystem: SubsystemKind, source: &Environment, target: &Environment) -> String {
    format!("{}:{}->{}", subsystem, source.id, target.id)
}

/// Checkpoint manager for mapping snapshots
pub struct CheckpointManager {
    /// Checkpoint storage backend
    storage: Arc<dyn CheckpointStorage + Send + Sync>,
}

impl CheckpointManager {
    /// Create a new CheckpointManager with a storage backend
    pub fn new_with_storage(storage: Arc<dyn CheckpointStorage + Send + Sync>) -> Self {
        Self { storage }
    }

    /// Load the snapshot saved for a key
    ///
    /// # Returns
    ///
    /// Returns `Ok(Some(snapshot))` if found, `Ok(None)` if not found, or an error.
    pub async fn load_snapshot(&self, key: &str) -> Result<Option<MappingSnapshot>> {
        let snapshot = self.storage.load(key).await?;
        match &snapshot {
            Some(s) => tracing::info!(
                checkpoint = key,
                entries = s.entry_count(),
                exported_at = %s.exported_at,
                "Loaded mapping checkpoint"
            ),
            None => tracing::info!(checkpoint = key, "No mapping checkpoint found"),
        }
        Ok(snapshot)
    }

    /// Save a snapshot under a key
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub async fn save_snapshot(&self, key: &str, snapshot: &MappingSnapshot) -> Result<()> {
        tracing::info!(
            checkpoint = key,
            mappings = snapshot.mappings.len(),
            entries = snapshot.entry_count(),
            "Checkpointing mapping snapshot"
        );

        self.storage.save(key, snapshot).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBackend, InjectedFailure};
    use crate::anonymization::masker::DeterministicMasker;
    use crate::anonymization::MappingStore;
    use crate::domain::{ColumnValue, ReplicaError};

    #[tokio::test]
    async fn test_save_and_load() {
        let backend = Arc::new(InMemoryBackend::new());
        let manager = CheckpointManager::new_with_storage(backend.clone());

        let mut store = MappingStore::new();
        store
            .create_mapping("users", "id", &[ColumnValue::from("u1")], &DeterministicMasker::default())
            .unwrap();
        let snapshot = store.export();

        assert!(manager.load_snapshot("k").await.unwrap().is_none());
        manager.save_snapshot("k", &snapshot).await.unwrap();
        assert_eq!(manager.load_snapshot("k").await.unwrap(), Some(snapshot));
        assert_eq!(backend.checkpoint_keys(), vec!["k"]);
    }

    #[tokio::test]
    async fn test_storage_failure_is_a_backend_error() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.inject(InjectedFailure::Checkpoint);
        let manager = CheckpointManager::new_with_storage(backend);
        assert!(matches!(
            manager.load_snapshot("k").await,
            Err(ReplicaError::Backend(_))
        ));
    }
}
