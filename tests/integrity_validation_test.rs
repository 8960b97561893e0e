//! Integration tests for referential integrity validation

use replica::adapters::file::{read_dataset, write_dataset};
use replica::anonymization::{validate, AnonymizationConfig, AnonymizationEngine, MappingStore};
use replica::domain::{ColumnDescriptor, ColumnType, ColumnValue, FkRelationship, RelationalDataset, Row, TableDescriptor};
use tempfile::tempdir;

fn rentals_and_bookings(booking_rental: &str) -> RelationalDataset {
    let rentals = TableDescriptor::new("rentals")
        .column(ColumnDescriptor::primary_key("id", ColumnType::Text));
    let bookings = TableDescriptor::new("bookings")
        .column(ColumnDescriptor::primary_key("id", ColumnType::Text))
        .column(ColumnDescriptor::new("rental_id", ColumnType::Text))
        .foreign_key("rental_id", "rentals", "id");
    RelationalDataset::new()
        .with_table(rentals, vec![Row::new(vec!["r1".into()]), Row::new(vec!["r2".into()])])
        .with_table(
            bookings,
            vec![
                Row::new(vec!["b1".into(), "r1".into()]),
                Row::new(vec!["b2".into(), booking_rental.into()]),
                Row::new(vec!["b3".into(), ColumnValue::Null]),
            ],
        )
}

#[test]
fn test_single_dangling_reference_is_named() {
    let dataset = rentals_and_bookings("r9");
    let report = validate(&dataset, &dataset.relationships());

    assert!(!report.is_valid);
    assert_eq!(report.errors.len(), 1);
    let violation = &report.errors[0];
    assert_eq!(violation.table, "bookings");
    assert_eq!(violation.column, "rental_id");
    assert_eq!(violation.value, "r9");
    assert_eq!(violation.target_table, "rentals");
    assert_eq!(violation.target_column, "id");
}

#[test]
fn test_nulls_are_not_violations() {
    let dataset = rentals_and_bookings("r2");
    let report = validate(&dataset, &dataset.relationships());
    assert!(report.is_valid, "{:?}", report.errors);
    assert_eq!(report.relationships_checked, 1);
}

#[test]
fn test_missing_target_is_a_warning() {
    let dataset = rentals_and_bookings("r1");
    let relationships = vec![FkRelationship::new("bookings", "rental_id", "listings", "id")];
    let report = validate(&dataset, &relationships);
    assert!(report.is_valid);
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_masked_dataset_survives_file_roundtrip() {
    let dataset = rentals_and_bookings("r2");
    let engine = AnonymizationEngine::new(AnonymizationConfig::default()).unwrap();
    let outcome = engine.process(dataset, MappingStore::new()).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("masked.json");
    write_dataset(&path, &outcome.dataset).unwrap();
    let reloaded = read_dataset(&path).unwrap();

    let report = validate(&reloaded, &reloaded.relationships());
    assert!(report.is_valid, "{:?}", report.errors);
}
