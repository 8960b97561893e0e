//! Redaction masking strategy

use super::ColumnMasker;
use crate::domain::{ColumnDescriptor, ColumnValue};
use chrono::DateTime;
use uuid::Uuid;

/// Redaction strategy - replaces values with fixed placeholders of the same type
///
/// Text becomes `[COLUMN_NAME]`; other types become their zero value.
pub struct RedactionStrategy;

impl RedactionStrategy {
    /// Create a new redaction strategy
    pub fn new() -> Self {
        Self
    }
}

impl ColumnMasker for RedactionStrategy {
    fn name(&self) -> &'static str {
        "redact"
    }

    fn mask_column(
        &self,
        value: &ColumnValue,
        column: &ColumnDescriptor,
        _context: &str,
    ) -> ColumnValue {
        match value {
            ColumnValue::Null => ColumnValue::Null,
            ColumnValue::Text(_) => ColumnValue::Text(format!("[{}]", column.name.to_uppercase())),
            ColumnValue::Integer(_) => ColumnValue::Integer(0),
            ColumnValue::Float(_) => ColumnValue::Float(0.0),
            ColumnValue::Bool(_) => ColumnValue::Bool(false),
            ColumnValue::Uuid(_) => ColumnValue::Uuid(Uuid::nil()),
            ColumnValue::Timestamp(_) => ColumnValue::Timestamp(DateTime::UNIX_EPOCH),
        }
    }
}

impl Default for RedactionStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ColumnType;

    #[test]
    fn test_redaction() {
        let strategy = RedactionStrategy::new();
        let column = ColumnDescriptor::new("email", ColumnType::Text);
        let result = strategy.mask_column(&ColumnValue::from("test@example.com"), &column, "users.email");
        assert_eq!(result, ColumnValue::from("[EMAIL]"));
    }

    #[test]
    fn test_redaction_keeps_type_and_null() {
        let strategy = RedactionStrategy::new();
        let column = ColumnDescriptor::new("base_price", ColumnType::Float);
        assert_eq!(
            strategy.mask_column(&ColumnValue::Float(150.0), &column, "rentals.base_price"),
            ColumnValue::Float(0.0)
        );
        assert_eq!(
            strategy.mask_column(&ColumnValue::Null, &column, "rentals.base_price"),
            ColumnValue::Null
        );
    }
}
