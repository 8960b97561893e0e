//! Rows and relational datasets

use super::table::{FkRelationship, TableDescriptor};
use super::value::ColumnValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A row of values aligned with its table descriptor's columns
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row(Vec<ColumnValue>);

impl Row {
    /// Creates a row from ordered values
    pub fn new(values: Vec<ColumnValue>) -> Self {
        Self(values)
    }

    /// Value at a column position
    pub fn get(&self, index: usize) -> Option<&ColumnValue> {
        self.0.get(index)
    }

    /// Replaces the value at a column position
    pub fn set(&mut self, index: usize, value: ColumnValue) {
        if let Some(slot) = self.0.get_mut(index) {
            *slot = value;
        }
    }

    /// Ordered values
    pub fn values(&self) -> &[ColumnValue] {
        &self.0
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the row holds no values
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builds a row from a JSON object using the descriptor's declared types
    ///
    /// Columns missing from the object become `Null`.
    pub fn from_json(descriptor: &TableDescriptor, object: &Map<String, JsonValue>) -> Result<Self, String> {
        let mut values = Vec::with_capacity(descriptor.columns.len());
        for column in &descriptor.columns {
            let raw = object.get(&column.name).unwrap_or(&JsonValue::Null);
            let value = ColumnValue::from_json(raw, column.column_type)
                .map_err(|e| format!("{}.{}: {e}", descriptor.name, column.name))?;
            if value.is_null() && !column.nullable {
                return Err(format!(
                    "{}.{}: NOT NULL column has no value",
                    descriptor.name, column.name
                ));
            }
            values.push(value);
        }
        Ok(Self(values))
    }

    /// Converts the row into a JSON object keyed by column name
    pub fn to_json(&self, descriptor: &TableDescriptor) -> JsonValue {
        let mut object = Map::new();
        for (column, value) in descriptor.columns.iter().zip(&self.0) {
            object.insert(column.name.clone(), value.to_json());
        }
        JsonValue::Object(object)
    }
}

impl From<Vec<ColumnValue>> for Row {
    fn from(values: Vec<ColumnValue>) -> Self {
        Self(values)
    }
}

/// A table descriptor together with its rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub descriptor: TableDescriptor,
    pub rows: Vec<Row>,
}

impl TableData {
    /// Creates table data
    pub fn new(descriptor: TableDescriptor, rows: Vec<Row>) -> Self {
        Self { descriptor, rows }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Values of one column across all rows
    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a ColumnValue> + 'a {
        let index = self.descriptor.column_index(column);
        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|i| row.get(i)))
    }
}

/// Ordered (descriptor, rows) pairs; the relationship set is the union of the
/// descriptors' foreign keys
///
/// # Examples
///
/// ```
/// use replica::domain::{ColumnDescriptor, ColumnType, ColumnValue, RelationalDataset, Row, TableDescriptor};
///
/// let users = TableDescriptor::new("users")
///     .column(ColumnDescriptor::primary_key("id", ColumnType::Text));
/// let mut dataset = RelationalDataset::new();
/// dataset.add_table(users, vec![Row::new(vec![ColumnValue::from("u1")])]);
/// assert_eq!(dataset.total_rows(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationalDataset {
    pub tables: Vec<TableData>,
}

impl RelationalDataset {
    /// Creates an empty dataset
    pub fn new() -> Self {
        Self { tables: Vec::new() }
    }

    /// Appends a table
    pub fn add_table(&mut self, descriptor: TableDescriptor, rows: Vec<Row>) {
        self.tables.push(TableData::new(descriptor, rows));
    }

    /// Builder-style variant of [`add_table`](Self::add_table)
    pub fn with_table(mut self, descriptor: TableDescriptor, rows: Vec<Row>) -> Self {
        self.add_table(descriptor, rows);
        self
    }

    /// Table by name
    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.tables.iter().find(|t| t.name() == name)
    }

    /// Mutable table by name
    pub fn table_mut(&mut self, name: &str) -> Option<&mut TableData> {
        self.tables.iter_mut().find(|t| t.name() == name)
    }

    /// Descriptors in dataset order
    pub fn descriptors(&self) -> Vec<TableDescriptor> {
        self.tables.iter().map(|t| t.descriptor.clone()).collect()
    }

    /// All declared relationships
    pub fn relationships(&self) -> Vec<FkRelationship> {
        self.tables
            .iter()
            .flat_map(|t| t.descriptor.foreign_keys.iter().cloned())
            .collect()
    }

    /// Total row count across tables
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    /// Builds a dataset from the JSON file layout
    ///
    /// ```json
    /// {"tables": [{"name": "users", "columns": [...], "foreign_keys": [...], "rows": [{...}]}]}
    /// ```
    pub fn from_json(value: &JsonValue) -> Result<Self, String> {
        let tables = value
            .get("tables")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| "dataset must contain a 'tables' array".to_string())?;

        let mut dataset = Self::new();
        for table in tables {
            let descriptor: TableDescriptor =
                serde_json::from_value(table.clone()).map_err(|e| format!("invalid table: {e}"))?;
            descriptor.validate()?;

            let mut rows = Vec::new();
            if let Some(raw_rows) = table.get("rows").and_then(JsonValue::as_array) {
                for raw in raw_rows {
                    let object = raw.as_object().ok_or_else(|| {
                        format!("rows of '{}' must be JSON objects", descriptor.name)
                    })?;
                    rows.push(Row::from_json(&descriptor, object)?);
                }
            }
            dataset.add_table(descriptor, rows);
        }
        Ok(dataset)
    }

    /// Converts the dataset into the JSON file layout
    pub fn to_json(&self) -> JsonValue {
        let tables = self
            .tables
            .iter()
            .map(|table| {
                let mut object = match serde_json::to_value(&table.descriptor) {
                    Ok(JsonValue::Object(map)) => map,
                    _ => Map::new(),
                };
                let rows = table
                    .rows
                    .iter()
                    .map(|row| row.to_json(&table.descriptor))
                    .collect();
                object.insert("rows".to_string(), JsonValue::Array(rows));
                JsonValue::Object(object)
            })
            .collect();
        serde_json::json!({ "tables": JsonValue::Array(tables) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::ColumnDescriptor;
    use crate::domain::value::ColumnType;
    use serde_json::json;

    fn dataset_json() -> JsonValue {
        json!({
            "tables": [
                {
                    "name": "users",
                    "columns": [
                        {"name": "id", "type": "text", "nullable": false, "primary_key": true},
                        {"name": "email", "type": "text", "sensitive": true}
                    ],
                    "rows": [{"id": "u1", "email": "a@example.com"}]
                },
                {
                    "name": "bookings",
                    "columns": [
                        {"name": "id", "type": "text", "nullable": false, "primary_key": true},
                        {"name": "user_id", "type": "text"}
                    ],
                    "foreign_keys": [
                        {"source_table": "bookings", "source_column": "user_id",
                         "target_table": "users", "target_column": "id"}
                    ],
                    "rows": [{"id": "b1", "user_id": "u1"}]
                }
            ]
        })
    }

    #[test]
    fn test_dataset_from_json() {
        let dataset = RelationalDataset::from_json(&dataset_json()).unwrap();
        assert_eq!(dataset.tables.len(), 2);
        assert_eq!(dataset.total_rows(), 2);
        assert_eq!(dataset.relationships().len(), 1);
        let users = dataset.table("users").unwrap();
        assert_eq!(users.rows[0].get(1), Some(&ColumnValue::from("a@example.com")));
    }

    #[test]
    fn test_dataset_json_roundtrip_preserves_rows() {
        let dataset = RelationalDataset::from_json(&dataset_json()).unwrap();
        let reparsed = RelationalDataset::from_json(&dataset.to_json()).unwrap();
        assert_eq!(dataset, reparsed);
    }

    #[test]
    fn test_not_null_violation_rejected() {
        let descriptor = TableDescriptor::new("users")
            .column(ColumnDescriptor::primary_key("id", ColumnType::Text));
        let object = json!({}).as_object().cloned().unwrap();
        assert!(Row::from_json(&descriptor, &object).is_err());
    }

    #[test]
    fn test_column_values() {
        let dataset = RelationalDataset::from_json(&dataset_json()).unwrap();
        let ids: Vec<_> = dataset.table("bookings").unwrap().column_values("user_id").collect();
        assert_eq!(ids, vec![&ColumnValue::from("u1")]);
    }
}
