//! Domain error types
//!
//! This module defines the error hierarchy for Replica. Collaborator failures are
//! mapped into domain errors so third-party types never leak through the API.

use thiserror::Error;

/// Main Replica error type
///
/// This is the primary error type used throughout the library.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Production safety violations
    #[error("Safety violation: {0}")]
    Safety(#[from] SafetyError),

    /// Row access or statement execution failures
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Dangling references detected after masking
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// ID mapping store errors (import/export, corrupt snapshots)
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation cancelled by a shutdown signal
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the production safety guard
///
/// These are never downgraded to warnings: a clone pipeline that receives one
/// aborts the remaining phases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyError {
    /// A write was attempted against a production-flagged environment
    #[error("Write operation '{operation}' blocked on production environment '{environment}'")]
    ProductionWriteBlocked {
        environment: String,
        operation: String,
    },

    /// The environment does not accept writes at all
    #[error("Environment '{environment}' does not allow writes")]
    WritesDisabled { environment: String },

    /// The environment cannot be used as a clone source
    #[error("Invalid clone source '{environment}': {reason}")]
    InvalidSource { environment: String, reason: String },

    /// The environment cannot be used as a clone target
    #[error("Invalid clone target '{environment}': {reason}")]
    InvalidTarget { environment: String, reason: String },
}

/// Errors raised by row access and SQL execution collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Fetching rows failed
    #[error("Failed to fetch rows from '{table}': {message}")]
    FetchFailed { table: String, message: String },

    /// Inserting rows failed
    #[error("Failed to insert rows into '{table}': {message}")]
    InsertFailed { table: String, message: String },

    /// Executing a statement failed
    #[error("Failed to execute '{statement}': {message}")]
    ExecuteFailed { statement: String, message: String },

    /// The collaborator timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Connection could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Checkpoint storage failure
    #[error("Checkpoint storage failed: {0}")]
    CheckpointFailed(String),
}

impl ReplicaError {
    /// Returns true when the error originates from the safety guard
    pub fn is_safety(&self) -> bool {
        matches!(self, ReplicaError::Safety(_))
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for ReplicaError {
    fn from(err: std::io::Error) -> Self {
        ReplicaError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ReplicaError {
    fn from(err: serde_json::Error) -> Self {
        ReplicaError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ReplicaError {
    fn from(err: toml::de::Error) -> Self {
        ReplicaError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replica_error_display() {
        let err = ReplicaError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_safety_error_conversion() {
        let safety = SafetyError::ProductionWriteBlocked {
            environment: "prod".to_string(),
            operation: "insert_rows".to_string(),
        };
        let err: ReplicaError = safety.into();
        assert!(err.is_safety());
        assert!(err.to_string().contains("blocked on production environment 'prod'"));
    }

    #[test]
    fn test_backend_error_conversion() {
        let backend = BackendError::FetchFailed {
            table: "users".to_string(),
            message: "timeout".to_string(),
        };
        let err: ReplicaError = backend.into();
        assert!(matches!(err, ReplicaError::Backend(_)));
        assert!(!err.is_safety());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: ReplicaError = io_err.into();
        assert!(matches!(err, ReplicaError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ReplicaError = json_err.into();
        assert!(matches!(err, ReplicaError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: ReplicaError = toml_err.into();
        assert!(matches!(err, ReplicaError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }
}
