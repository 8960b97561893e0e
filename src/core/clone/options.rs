//! Clone options

use crate::anonymization::MappingSnapshot;
use crate::core::subsystem::SubsystemKind;
use crate::domain::{Environment, ReplicaError, Result};

/// What to clone, from where to where, and how
#[derive(Debug, Clone)]
pub struct CloneOptions {
    pub subsystem: SubsystemKind,
    pub source: Environment,
    pub target: Environment,
    /// Mask the data before it reaches the target
    pub anonymize: bool,
    /// Filter expression passed to the row fetcher for every table
    pub row_filter: Option<String>,
    /// Mappings from an earlier run to reuse
    pub mapping_snapshot: Option<MappingSnapshot>,
    /// Load the stored mapping checkpoint for this subsystem and environment pair
    pub resume: bool,
    /// Plan only: no statements or inserts are sent
    pub dry_run: bool,
}

impl CloneOptions {
    /// Creates anonymizing options for a subsystem clone
    pub fn new(subsystem: SubsystemKind, source: Environment, target: Environment) -> Self {
        Self {
            subsystem,
            source,
            target,
            anonymize: true,
            row_filter: None,
            mapping_snapshot: None,
            resume: false,
            dry_run: false,
        }
    }

    pub fn with_anonymize(mut self, anonymize: bool) -> Self {
        self.anonymize = anonymize;
        self
    }

    pub fn with_row_filter(mut self, filter: impl Into<String>) -> Self {
        self.row_filter = Some(filter.into());
        self
    }

    pub fn with_mapping_snapshot(mut self, snapshot: MappingSnapshot) -> Self {
        self.mapping_snapshot = Some(snapshot);
        self
    }

    pub fn resuming(mut self) -> Self {
        self.resume = true;
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Rejects option combinations that can never succeed
    pub fn validate(&self) -> Result<()> {
        if self.source.id == self.target.id {
            return Err(ReplicaError::Validation(format!(
                "Source and target are the same environment: {}",
                self.source.id
            )));
        }
        if let Some(filter) = &self.row_filter {
            if filter.trim().is_empty() {
                return Err(ReplicaError::Validation(
                    "Row filter cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EnvironmentType;

    fn env(id: &str) -> Environment {
        Environment::new(id, id, EnvironmentType::Development).unwrap()
    }

    #[test]
    fn test_defaults() {
        let options = CloneOptions::new(SubsystemKind::Billing, env("a"), env("b"));
        assert!(options.anonymize);
        assert!(!options.dry_run);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_same_environment_rejected() {
        let options = CloneOptions::new(SubsystemKind::Billing, env("a"), env("a"));
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_blank_filter_rejected() {
        let options =
            CloneOptions::new(SubsystemKind::Billing, env("a"), env("b")).with_row_filter("  ");
        assert!(options.validate().is_err());
    }
}
