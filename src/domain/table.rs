//! Table descriptors and foreign-key relationships

use super::value::ColumnType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relationship cardinality tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    OneToOne,
    ManyToOne,
    OneToMany,
    ManyToMany,
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::ManyToOne
    }
}

/// Declared reference from one table's column to another table's column
///
/// # Examples
///
/// ```
/// use replica::domain::FkRelationship;
///
/// let fk = FkRelationship::new("bookings", "user_id", "users", "id");
/// assert_eq!(fk.to_string(), "bookings.user_id -> users.id");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FkRelationship {
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub cascade: bool,
}

impl FkRelationship {
    /// Creates a many-to-one relationship without cascade
    pub fn new(
        source_table: impl Into<String>,
        source_column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        Self {
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
            cardinality: Cardinality::default(),
            cascade: false,
        }
    }

    /// Sets the cardinality tag
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    /// Marks the relationship as cascading
    pub fn cascading(mut self) -> Self {
        self.cascade = true;
        self
    }

    /// True when the relationship points back at its own table
    pub fn is_self_reference(&self) -> bool {
        self.source_table == self.target_table
    }
}

impl fmt::Display for FkRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.source_table, self.source_column, self.target_table, self.target_column
        )
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    #[serde(rename = "type", default)]
    pub column_type: ColumnType,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the column holds values that must be masked
    #[serde(default)]
    pub sensitive: bool,
}

fn default_nullable() -> bool {
    true
}

impl ColumnDescriptor {
    /// Creates a nullable, non-sensitive column
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary_key: false,
            sensitive: false,
        }
    }

    /// Creates a NOT NULL primary-key column
    pub fn primary_key(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            nullable: false,
            primary_key: true,
            ..Self::new(name, column_type)
        }
    }

    /// Marks the column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Marks the column as sensitive
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Heuristic for reference-like columns that carry no declared relationship
    pub fn looks_like_reference(&self) -> bool {
        !self.primary_key
            && (self.name.ends_with("_id") || self.name.ends_with("Id"))
            && matches!(
                self.column_type,
                ColumnType::Uuid | ColumnType::Integer | ColumnType::Text
            )
    }
}

/// Table metadata: ordered columns plus the relationships it is the source of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub foreign_keys: Vec<FkRelationship>,
}

impl TableDescriptor {
    /// Creates an empty descriptor
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Appends a column
    pub fn column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Declares a many-to-one foreign key from one of this table's columns
    pub fn foreign_key(
        mut self,
        column: impl Into<String>,
        target_table: impl Into<String>,
        target_column: impl Into<String>,
    ) -> Self {
        let fk = FkRelationship::new(self.name.clone(), column, target_table, target_column);
        self.foreign_keys.push(fk);
        self
    }

    /// Declares a fully specified relationship (its source table is forced to this table)
    pub fn relationship(mut self, mut fk: FkRelationship) -> Self {
        fk.source_table = self.name.clone();
        self.foreign_keys.push(fk);
        self
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key columns in declaration order
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Relationship whose source is the given column
    pub fn foreign_key_for(&self, column: &str) -> Option<&FkRelationship> {
        self.foreign_keys.iter().find(|fk| fk.source_column == column)
    }

    /// Validates internal consistency of the descriptor
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Table name cannot be empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(format!(
                    "Duplicate column '{}' in table '{}'",
                    column.name, self.name
                ));
            }
        }
        for fk in &self.foreign_keys {
            if fk.source_table != self.name {
                return Err(format!(
                    "Relationship {fk} is declared on table '{}'",
                    self.name
                ));
            }
            if self.column_index(&fk.source_column).is_none() {
                return Err(format!(
                    "Relationship {fk} references unknown column '{}'",
                    fk.source_column
                ));
            }
        }
        Ok(())
    }
}
