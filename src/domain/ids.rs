//! Domain identifier types with validation
//!
//! Newtype wrappers keep environment identifiers and clone operation identifiers
//! from being mixed up with plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Environment identifier newtype wrapper
///
/// # Examples
///
/// ```
/// use replica::domain::ids::EnvironmentId;
/// use std::str::FromStr;
///
/// let id = EnvironmentId::from_str("staging-eu").unwrap();
/// assert_eq!(id.as_str(), "staging-eu");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvironmentId(String);

impl EnvironmentId {
    /// Creates a new EnvironmentId, rejecting blank values
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err("Environment ID cannot be empty".to_string());
        }
        if id.chars().any(char::is_whitespace) {
            return Err(format!("Environment ID cannot contain whitespace: '{id}'"));
        }
        Ok(Self(id))
    }

    /// Returns the environment ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EnvironmentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for EnvironmentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Clone operation identifier
///
/// A random UUID v4 assigned when an orchestration run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Generates a fresh operation identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OperationId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| format!("Invalid operation ID '{s}': {e}"))
    }
}
