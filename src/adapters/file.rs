//! JSON file adapters
//!
//! Datasets and mapping snapshots are exchanged as JSON files by the CLI, and
//! [`JsonFileCheckpointStorage`] keeps one snapshot file per checkpoint key.

use crate::adapters::traits::CheckpointStorage;
use crate::anonymization::MappingSnapshot;
use crate::domain::{BackendError, RelationalDataset, ReplicaError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads a dataset from a JSON file
pub fn read_dataset(path: &Path) -> Result<RelationalDataset> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReplicaError::Io(format!("Failed to read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    RelationalDataset::from_json(&value)
        .map_err(|e| ReplicaError::Validation(format!("{}: {e}", path.display())))
}

/// Writes a dataset as pretty-printed JSON
pub fn write_dataset(path: &Path, dataset: &RelationalDataset) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(&dataset.to_json())?;
    std::fs::write(path, json)
        .map_err(|e| ReplicaError::Io(format!("Failed to write {}: {e}", path.display())))
}

/// Reads a mapping snapshot from a JSON file
pub fn read_snapshot(path: &Path) -> Result<MappingSnapshot> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ReplicaError::Io(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| ReplicaError::Mapping(format!("Invalid mapping snapshot {}: {e}", path.display())))
}

/// Writes a mapping snapshot as pretty-printed JSON
pub fn write_snapshot(path: &Path, snapshot: &MappingSnapshot) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(path, json)
        .map_err(|e| ReplicaError::Io(format!("Failed to write {}: {e}", path.display())))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Checkpoint storage writing `<directory>/<key>.json`
#[derive(Debug, Clone)]
pub struct JsonFileCheckpointStorage {
    directory: PathBuf,
}

impl JsonFileCheckpointStorage {
    /// Create storage rooted at a directory (created on first save)
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// File path for a key; characters outside `[A-Za-z0-9_-]` become `_`
    pub fn path_for(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.directory.join(format!("{file_name}.json"))
    }
}

#[async_trait]
impl CheckpointStorage for JsonFileCheckpointStorage {
    async fn load(&self, key: &str) -> std::result::Result<Option<MappingSnapshot>, BackendError> {
        let path = self.path_for(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BackendError::CheckpointFailed(format!(
                    "Failed to read {}: {e}",
                    path.display()
                )))
            }
        };
        serde_json::from_str(&content).map(Some).map_err(|e| {
            BackendError::CheckpointFailed(format!("Corrupt checkpoint {}: {e}", path.display()))
        })
    }

    async fn save(&self, key: &str, snapshot: &MappingSnapshot) -> std::result::Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.directory).await.map_err(|e| {
            BackendError::CheckpointFailed(format!(
                "Failed to create {}: {e}",
                self.directory.display()
            ))
        })?;

        let path = self.path_for(key);
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| BackendError::CheckpointFailed(e.to_string()))?;

        // Written beside the target and renamed into place
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            BackendError::CheckpointFailed(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            BackendError::CheckpointFailed(format!("Failed to replace {}: {e}", path.display()))
        })
    }
}
