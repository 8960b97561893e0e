//! Environment-flag safety guard
//!
//! A [`SafetyGuard`] that decides from the environment's own flags: anything
//! may be read, production environments are never written, and writes require
//! `allow_writes`.

use crate::adapters::traits::SafetyGuard;
use crate::domain::{Environment, SafetyError};
use async_trait::async_trait;

/// Guard driven by `is_production` / `allow_writes`
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentFlagGuard;

impl EnvironmentFlagGuard {
    /// Create a new guard
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SafetyGuard for EnvironmentFlagGuard {
    async fn validate_clone_source(&self, _environment: &Environment) -> Result<(), SafetyError> {
        Ok(())
    }

    async fn validate_clone_target(&self, environment: &Environment) -> Result<(), SafetyError> {
        if environment.is_production {
            return Err(SafetyError::InvalidTarget {
                environment: environment.id.to_string(),
                reason: "production environments cannot receive clones".to_string(),
            });
        }
        if !environment.allow_writes {
            return Err(SafetyError::WritesDisabled {
                environment: environment.id.to_string(),
            });
        }
        Ok(())
    }

    async fn enforce_read_only_access(
        &self,
        environment: &Environment,
        operation: &str,
    ) -> Result<(), SafetyError> {
        if environment.is_production {
            tracing::error!(
                environment = %environment.id,
                operation,
                "Blocked write to production environment"
            );
            return Err(SafetyError::ProductionWriteBlocked {
                environment: environment.id.to_string(),
                operation: operation.to_string(),
            });
        }
        if !environment.allow_writes {
            return Err(SafetyError::WritesDisabled {
                environment: environment.id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvironmentType;

    #[tokio::test]
    async fn test_production_target_rejected() {
        let guard = EnvironmentFlagGuard::new();
        let prod = Environment::new("prod", "Production", EnvironmentType::Production).unwrap();
        assert!(guard.validate_clone_source(&prod).await.is_ok());
        assert!(matches!(
            guard.validate_clone_target(&prod).await,
            Err(SafetyError::InvalidTarget { .. })
        ));
        assert!(matches!(
            guard.enforce_read_only_access(&prod, "schema").await,
            Err(SafetyError::ProductionWriteBlocked { .. })
        ));
    }

    #[tokio::test]
    async fn test_read_only_staging_rejected() {
        let guard = EnvironmentFlagGuard::new();
        let staging = Environment::new("staging", "Staging", EnvironmentType::Staging)
            .unwrap()
            .with_writes(false);
        assert!(matches!(
            guard.enforce_read_only_access(&staging, "insert_rows").await,
            Err(SafetyError::WritesDisabled { .. })
        ));
    }

    #[tokio::test]
    async fn test_development_target_allowed() {
        let guard = EnvironmentFlagGuard::new();
        let dev = Environment::new("dev", "Dev", EnvironmentType::Development).unwrap();
        assert!(guard.validate_clone_target(&dev).await.is_ok());
        assert!(guard.enforce_read_only_access(&dev, "schema").await.is_ok());
    }
}
