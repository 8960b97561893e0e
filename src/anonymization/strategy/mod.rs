//! Column masking strategies
//!
//! Sensitive non-key columns are masked through a [`ColumnMasker`]. The engine
//! picks one per column from the configured default strategy and any
//! per-column rules.

pub mod deterministic;
pub mod redaction;

use crate::domain::{ColumnDescriptor, ColumnValue};
use serde::{Deserialize, Serialize};

pub use deterministic::DeterministicStrategy;
pub use redaction::RedactionStrategy;

/// Trait for sensitive-column masking strategies
pub trait ColumnMasker: Send + Sync {
    /// Short strategy name used in reports and audit records
    fn name(&self) -> &'static str;

    /// Masks one value of `column`; `context` is the `table.column` key
    fn mask_column(
        &self,
        value: &ColumnValue,
        column: &ColumnDescriptor,
        context: &str,
    ) -> ColumnValue;
}

/// Strategy selector used in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaskingStrategy {
    /// Realistic fictitious values derived from a stable hash
    #[default]
    Deterministic,
    /// Fixed type-preserving placeholders
    Redact,
}

impl MaskingStrategy {
    /// Creates the masker for this strategy
    pub fn build(self, timestamp_window_days: u32) -> Box<dyn ColumnMasker> {
        match self {
            MaskingStrategy::Deterministic => {
                Box::new(DeterministicStrategy::with_timestamp_window(timestamp_window_days))
            }
            MaskingStrategy::Redact => Box::new(RedactionStrategy::new()),
        }
    }
}

impl std::str::FromStr for MaskingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deterministic" => Ok(MaskingStrategy::Deterministic),
            "redact" => Ok(MaskingStrategy::Redact),
            other => Err(format!("Unknown masking strategy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "Deterministic".parse::<MaskingStrategy>().unwrap(),
            MaskingStrategy::Deterministic
        );
        assert_eq!("redact".parse::<MaskingStrategy>().unwrap(), MaskingStrategy::Redact);
        assert!("token".parse::<MaskingStrategy>().is_err());
    }

    #[test]
    fn test_build_names() {
        assert_eq!(MaskingStrategy::Deterministic.build(30).name(), "deterministic");
        assert_eq!(MaskingStrategy::Redact.build(30).name(), "redact");
    }
}
