//! Clone source/target environments

use super::ids::EnvironmentId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    /// Development environment
    #[default]
    Development,
    /// Test/QA environment
    Testing,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EnvironmentType::Development => "development",
            EnvironmentType::Testing => "testing",
            EnvironmentType::Staging => "staging",
            EnvironmentType::Production => "production",
        };
        write!(f, "{label}")
    }
}

/// An environment a clone reads from or writes to
///
/// # Examples
///
/// ```
/// use replica::domain::{Environment, EnvironmentType};
///
/// let staging = Environment::new("staging", "Staging", EnvironmentType::Staging).unwrap();
/// assert!(staging.allow_writes);
/// assert!(!staging.is_production);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    #[serde(rename = "type")]
    pub environment_type: EnvironmentType,
    pub is_production: bool,
    pub allow_writes: bool,
}

impl Environment {
    /// Creates an environment; production environments are created read-only
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        environment_type: EnvironmentType,
    ) -> Result<Self, String> {
        let is_production = environment_type == EnvironmentType::Production;
        Ok(Self {
            id: EnvironmentId::new(id)?,
            name: name.into(),
            environment_type,
            is_production,
            allow_writes: !is_production,
        })
    }

    /// Overrides the write permission flag
    pub fn with_writes(mut self, allow_writes: bool) -> Self {
        self.allow_writes = allow_writes;
        self
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.environment_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_is_read_only_by_default() {
        let prod = Environment::new("prod", "Production", EnvironmentType::Production).unwrap();
        assert!(prod.is_production);
        assert!(!prod.allow_writes);
    }

    #[test]
    fn test_invalid_id_rejected() {
        assert!(Environment::new("", "x", EnvironmentType::Development).is_err());
    }

    #[test]
    fn test_display() {
        let dev = Environment::new("dev", "Dev", EnvironmentType::Development).unwrap();
        assert_eq!(dev.to_string(), "dev (development)");
    }
}
