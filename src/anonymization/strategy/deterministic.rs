//! Deterministic masking strategy

use super::ColumnMasker;
use crate::anonymization::masker::DeterministicMasker;
use crate::domain::{ColumnDescriptor, ColumnValue};

/// Masks values with the [`DeterministicMasker`] under the column's context
#[derive(Debug, Clone, Default)]
pub struct DeterministicStrategy {
    masker: DeterministicMasker,
}

impl DeterministicStrategy {
    /// Create a strategy with the default masker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a strategy with a custom timestamp shift window
    pub fn with_timestamp_window(days: u32) -> Self {
        Self {
            masker: DeterministicMasker::with_timestamp_window(days),
        }
    }
}

impl ColumnMasker for DeterministicStrategy {
    fn name(&self) -> &'static str {
        "deterministic"
    }

    fn mask_column(
        &self,
        value: &ColumnValue,
        column: &ColumnDescriptor,
        context: &str,
    ) -> ColumnValue {
        self.masker.mask(value, context).conform_to(column.column_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnType;

    #[test]
    fn test_deterministic_strategy() {
        let strategy = DeterministicStrategy::new();
        let column = ColumnDescriptor::new("email", ColumnType::Text).sensitive();
        let value = ColumnValue::from("test@example.com");

        let first = strategy.mask_column(&value, &column, "users.email");
        let second = strategy.mask_column(&value, &column, "users.email");
        assert_eq!(first, second);
        assert_ne!(first, value);
    }
}
