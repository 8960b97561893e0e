//! Referential integrity validation
//!
//! Checks that every non-null foreign-key value in a dataset exists in the
//! referenced column of the referenced table.

use crate::domain::{FkRelationship, RelationalDataset};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// A foreign-key value with no matching row in the referenced table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityViolation {
    pub table: String,
    pub column: String,
    /// Canonical form of the dangling value
    pub value: String,
    pub target_table: String,
    pub target_column: String,
}

impl fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} = '{}' has no match in {}.{}",
            self.table, self.column, self.value, self.target_table, self.target_column
        )
    }
}

/// Outcome of a validation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub is_valid: bool,
    pub errors: Vec<IntegrityViolation>,
    /// Relationships that could not be checked
    pub warnings: Vec<String>,
    pub relationships_checked: usize,
}

/// Validates every relationship against the dataset
///
/// Missing target tables or columns (and missing source tables) are warnings,
/// not errors. `is_valid` is true exactly when no violation was found.
///
/// # Examples
///
/// ```
/// use replica::anonymization::validator::validate;
/// use replica::domain::{ColumnDescriptor, ColumnType, RelationalDataset, Row, TableDescriptor};
///
/// let users = TableDescriptor::new("users")
///     .column(ColumnDescriptor::primary_key("id", ColumnType::Text));
/// let bookings = TableDescriptor::new("bookings")
///     .column(ColumnDescriptor::new("user_id", ColumnType::Text))
///     .foreign_key("user_id", "users", "id");
/// let dataset = RelationalDataset::new()
///     .with_table(users, vec![Row::new(vec!["u1".into()])])
///     .with_table(bookings, vec![Row::new(vec!["u2".into()])]);
///
/// let report = validate(&dataset, &dataset.relationships());
/// assert!(!report.is_valid);
/// assert_eq!(report.errors[0].value, "u2");
/// ```
pub fn validate(dataset: &RelationalDataset, relationships: &[FkRelationship]) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    for fk in relationships {
        let Some(target) = dataset.table(&fk.target_table) else {
            report
                .warnings
                .push(format!("{fk}: target table '{}' not found", fk.target_table));
            continue;
        };
        if target.descriptor.get_column(&fk.target_column).is_none() {
            report.warnings.push(format!(
                "{fk}: target column '{}' not found",
                fk.target_column
            ));
            continue;
        }
        let Some(source) = dataset.table(&fk.source_table) else {
            report
                .warnings
                .push(format!("{fk}: source table '{}' not found", fk.source_table));
            continue;
        };
        if source.descriptor.get_column(&fk.source_column).is_none() {
            report.warnings.push(format!(
                "{fk}: source column '{}' not found",
                fk.source_column
            ));
            continue;
        }

        let present: HashSet<String> = target
            .column_values(&fk.target_column)
            .filter_map(|v| v.canonical_key())
            .collect();

        for value in source.column_values(&fk.source_column) {
            let Some(key) = value.canonical_key() else {
                continue;
            };
            if !present.contains(&key) {
                report.errors.push(IntegrityViolation {
                    table: fk.source_table.clone(),
                    column: fk.source_column.clone(),
                    value: key,
                    target_table: fk.target_table.clone(),
                    target_column: fk.target_column.clone(),
                });
            }
        }
        report.relationships_checked += 1;
    }

    report.is_valid = report.errors.is_empty();

    if report.is_valid {
        tracing::debug!(
            relationships = report.relationships_checked,
            "Referential integrity validated"
        );
    } else {
        tracing::warn!(
            violations = report.errors.len(),
            relationships = report.relationships_checked,
            "Referential integrity violations found"
        );
    }

    report
}
