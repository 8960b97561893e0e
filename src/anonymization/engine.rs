//! Relational anonymization engine
//!
//! This module provides the [`AnonymizationEngine`] that masks a multi-table
//! dataset while keeping every foreign key pointing at its (identically masked)
//! parent row.
//!
//! # Architecture
//!
//! A run combines:
//! - **Graph resolver**: orders tables so referenced tables come first
//! - **Mapping store**: one bijection per key column, shared by all references
//! - **Strategies**: mask sensitive non-key columns
//! - **Audit logger**: records digests of what was masked
//!
//! # Examples
//!
//! ```
//! use replica::anonymization::{AnonymizationEngine, AnonymizationConfig, MappingStore};
//! use replica::domain::{ColumnDescriptor, ColumnType, ColumnValue, RelationalDataset, Row, TableDescriptor};
//!
//! # fn example() -> replica::domain::Result<()> {
//! let users = TableDescriptor::new("users")
//!     .column(ColumnDescriptor::primary_key("id", ColumnType::Text));
//! let bookings = TableDescriptor::new("bookings")
//!     .column(ColumnDescriptor::primary_key("id", ColumnType::Text))
//!     .column(ColumnDescriptor::new("user_id", ColumnType::Text))
//!     .foreign_key("user_id", "users", "id");
//! let dataset = RelationalDataset::new()
//!     .with_table(bookings, vec![Row::new(vec!["b1".into(), "u1".into()])])
//!     .with_table(users, vec![Row::new(vec!["u1".into()])]);
//!
//! let engine = AnonymizationEngine::new(AnonymizationConfig::default())?;
//! let outcome = engine.process(dataset, MappingStore::new())?;
//!
//! let masked_user = &outcome.dataset.table("users").unwrap().rows[0];
//! let masked_booking = &outcome.dataset.table("bookings").unwrap().rows[0];
//! assert_eq!(masked_booking.get(1), masked_user.get(0));
//! # Ok(())
//! # }
//! ```

use crate::anonymization::{
    audit::AuditLogger,
    config::AnonymizationConfig,
    graph,
    mapping::{mapping_key, MappingStore},
    masker::DeterministicMasker,
    report::{AnonymizationReport, ColumnTally, ColumnTreatment, TableReport},
    strategy::{ColumnMasker, MaskingStrategy},
};
use crate::domain::{
    ColumnValue, FkRelationship, RelationalDataset, ReplicaError, Result, TableDescriptor,
};
use std::collections::{HashMap, HashSet};
use std::time::Instant;

/// Result of an engine run
#[derive(Debug, Clone)]
pub struct AnonymizationOutcome {
    /// Masked dataset (the input unchanged in dry-run mode)
    pub dataset: RelationalDataset,
    /// Mapping store after the run (the input unchanged in dry-run mode)
    pub store: MappingStore,
    pub report: AnonymizationReport,
}

/// How one column is rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnPlan {
    Keep,
    /// Primary key or referenced column, mapped through its own mapping
    Key,
    /// Declared relationship, resolved through the referenced column
    Reference,
    /// Reference without a usable relationship
    Fallback,
    Sensitive(MaskingStrategy),
}

impl ColumnPlan {
    fn treatment(self) -> Option<ColumnTreatment> {
        match self {
            ColumnPlan::Keep => None,
            ColumnPlan::Key => Some(ColumnTreatment::PrimaryKey),
            ColumnPlan::Reference => Some(ColumnTreatment::ForeignKey),
            ColumnPlan::Fallback => Some(ColumnTreatment::FallbackReference),
            ColumnPlan::Sensitive(_) => Some(ColumnTreatment::Sensitive),
        }
    }
}

/// Relational anonymization engine
///
/// The engine holds configuration only; each call to
/// [`process`](Self::process) owns the [`MappingStore`] it is given, so one
/// engine can be shared across independent runs.
pub struct AnonymizationEngine {
    config: AnonymizationConfig,
    masker: DeterministicMasker,
    strategies: HashMap<MaskingStrategy, Box<dyn ColumnMasker>>,
    audit_logger: Option<AuditLogger>,
}

impl AnonymizationEngine {
    /// Create a new anonymization engine
    ///
    /// # Errors
    ///
    /// Returns [`ReplicaError::Configuration`] if the configuration is invalid
    /// or the audit log cannot be prepared.
    pub fn new(config: AnonymizationConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ReplicaError::Configuration(format!("{e:#}")))?;

        let window = config.timestamp_window_days;
        let strategies = [MaskingStrategy::Deterministic, MaskingStrategy::Redact]
            .into_iter()
            .map(|s| (s, s.build(window)))
            .collect();

        let audit_logger = if config.audit.enabled {
            Some(
                AuditLogger::new(config.audit.log_path.clone(), config.audit.json_format, true)
                    .map_err(|e| ReplicaError::Configuration(format!("{e:#}")))?,
            )
        } else {
            None
        };

        Ok(Self {
            masker: DeterministicMasker::with_timestamp_window(window),
            config,
            strategies,
            audit_logger,
        })
    }

    /// Check if anonymization is enabled
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Check if in dry-run mode
    pub fn is_dry_run(&self) -> bool {
        self.config.dry_run
    }

    /// Masks a dataset
    ///
    /// 1. Orders tables so referenced tables come first (skipped edges become
    ///    warnings).
    /// 2. Maps every key column (primary keys and referenced columns) before
    ///    any row is rewritten.
    /// 3. Rewrites rows: keys through their own mapping, declared foreign keys
    ///    through the referenced column's mapping, undeclared `*_id` columns
    ///    through a fallback mapping, sensitive columns through their strategy.
    ///
    /// Table order, row counts and untouched columns are preserved. Nulls stay
    /// null.
    pub fn process(
        &self,
        dataset: RelationalDataset,
        store: MappingStore,
    ) -> Result<AnonymizationOutcome> {
        let start = Instant::now();
        let dry_run = self.config.dry_run;
        let mut report = AnonymizationReport::new(dry_run);

        if !self.config.enabled {
            report.add_warning("Anonymization is disabled; dataset returned unchanged");
            return Ok(AnonymizationOutcome {
                dataset,
                store,
                report,
            });
        }

        let relationships = self.usable_relationships(&dataset, &mut report);

        let names: Vec<&str> = dataset.tables.iter().map(|t| t.name()).collect();
        let order = graph::order(&names, &relationships);
        for edge in &order.skipped_edges {
            report.skipped_edges.push(edge.to_string());
            if edge.is_self_reference() {
                report.add_warning(format!(
                    "Self reference {edge} is resolved within its own table"
                ));
            } else {
                report.add_warning(format!(
                    "Relationship {edge} closes a cycle; referenced values are mapped on demand"
                ));
            }
        }
        report.processing_order = order.tables.clone();

        tracing::info!(
            tables = order.tables.len(),
            rows = dataset.total_rows(),
            relationships = relationships.len(),
            dry_run,
            "Starting anonymization run"
        );

        let mut working_store = store.clone();
        let mut working = dataset.clone();

        let referenced: HashSet<(String, String)> = relationships
            .iter()
            .map(|fk| (fk.target_table.clone(), fk.target_column.clone()))
            .collect();

        // Plans per table, computed once
        let mut plans: HashMap<String, Vec<ColumnPlan>> = HashMap::new();
        for table in &working.tables {
            let plan = self.plan_table(&table.descriptor, &relationships, &referenced, &mut report);
            plans.insert(table.name().to_string(), plan);
        }

        // Key columns first, so rows in any table see their parents' mappings
        for name in &order.tables {
            let (Some(table), Some(plan)) = (working.table(name), plans.get(name)) else {
                continue;
            };
            for (index, column) in table.descriptor.columns.iter().enumerate() {
                if plan[index] != ColumnPlan::Key {
                    continue;
                }
                let values: Vec<ColumnValue> = table.column_values(&column.name).cloned().collect();
                let is_reference_source = relationships
                    .iter()
                    .any(|fk| fk.source_table == *name && fk.source_column == column.name);

                if is_reference_source {
                    for value in &values {
                        working_store.map_value(value, name, &column.name, &relationships, &self.masker)?;
                    }
                } else {
                    working_store.create_mapping(name, &column.name, &values, &self.masker)?;
                }
            }
        }

        for name in &order.tables {
            let Some(plan) = plans.get(name) else {
                continue;
            };
            let Some(table) = working.table_mut(name) else {
                continue;
            };
            let descriptor = table.descriptor.clone();
            let mut tallies: Vec<Option<ColumnTally>> = plan
                .iter()
                .zip(&descriptor.columns)
                .map(|(p, c)| {
                    p.treatment()
                        .map(|t| ColumnTally::new(&c.name, t, self.strategy_label(*p)))
                })
                .collect();

            for row in table.rows.iter_mut() {
                for (index, column) in descriptor.columns.iter().enumerate() {
                    let column_plan = plan[index];
                    if column_plan == ColumnPlan::Keep {
                        continue;
                    }
                    let Some(original) = row.get(index).cloned() else {
                        continue;
                    };
                    let Some(canonical) = original.canonical_key() else {
                        continue;
                    };

                    let masked = match column_plan {
                        ColumnPlan::Keep => continue,
                        ColumnPlan::Key => working_store.map_value(
                            &original,
                            name,
                            &column.name,
                            &relationships,
                            &self.masker,
                        )?,
                        ColumnPlan::Reference | ColumnPlan::Fallback => working_store
                            .resolve(&original, name, &column.name, &relationships, &self.masker)?
                            .into_value(),
                        ColumnPlan::Sensitive(strategy) => {
                            let context = mapping_key(name, &column.name);
                            self.strategy(strategy)?.mask_column(&original, column, &context)
                        }
                    };

                    if let Some(tally) = tallies[index].as_mut() {
                        tally.record(&canonical);
                    }
                    row.set(index, masked.conform_to(column.column_type));
                }
            }

            let mut table_report = TableReport::new(name.clone(), table.rows.len());
            table_report.columns = tallies.into_iter().flatten().map(ColumnTally::finish).collect();
            tracing::debug!(
                table = %name,
                rows = table_report.rows,
                masked = table_report.values_masked(),
                "Table anonymized"
            );
            report.tables.push(table_report);
        }

        report.mapping_fingerprint = Some(working_store.fingerprint());
        report.processing_time_ms = start.elapsed().as_millis() as u64;

        if let Some(ref logger) = self.audit_logger {
            logger
                .log_run(&report)
                .map_err(|e| ReplicaError::Io(format!("Audit logging failed: {e:#}")))?;
        }

        tracing::info!(
            rows = report.total_rows(),
            masked = report.total_masked(),
            warnings = report.warnings.len(),
            duration_ms = report.processing_time_ms,
            "Anonymization run completed"
        );

        if dry_run {
            return Ok(AnonymizationOutcome {
                dataset,
                store,
                report,
            });
        }

        Ok(AnonymizationOutcome {
            dataset: working,
            store: working_store,
            report,
        })
    }

    /// Relationships whose target table and column exist in the dataset
    fn usable_relationships(
        &self,
        dataset: &RelationalDataset,
        report: &mut AnonymizationReport,
    ) -> Vec<FkRelationship> {
        let mut usable = Vec::new();
        for fk in dataset.relationships() {
            match dataset.table(&fk.target_table) {
                None => {
                    tracing::warn!(relationship = %fk, "Relationship targets an unknown table");
                    report.add_warning(format!(
                        "Relationship {fk} targets unknown table '{}'; values masked through a fallback mapping",
                        fk.target_table
                    ));
                }
                Some(target) if target.descriptor.get_column(&fk.target_column).is_none() => {
                    tracing::warn!(relationship = %fk, "Relationship targets an unknown column");
                    report.add_warning(format!(
                        "Relationship {fk} targets unknown column '{}'; values masked through a fallback mapping",
                        fk.target_column
                    ));
                }
                Some(_) => usable.push(fk),
            }
        }
        usable
    }

    fn plan_table(
        &self,
        descriptor: &TableDescriptor,
        relationships: &[FkRelationship],
        referenced: &HashSet<(String, String)>,
        report: &mut AnonymizationReport,
    ) -> Vec<ColumnPlan> {
        descriptor
            .columns
            .iter()
            .map(|column| {
                let table = descriptor.name.as_str();
                let has_relationship = relationships
                    .iter()
                    .any(|fk| fk.source_table == table && fk.source_column == column.name);
                let declared_but_unusable =
                    !has_relationship && descriptor.foreign_key_for(&column.name).is_some();
                let is_key = column.primary_key
                    || referenced.contains(&(table.to_string(), column.name.clone()));

                // A key that is also a reference keeps its parent's identity
                if is_key {
                    return ColumnPlan::Key;
                }
                if has_relationship {
                    return ColumnPlan::Reference;
                }
                if declared_but_unusable {
                    return ColumnPlan::Fallback;
                }

                let (sensitive, strategy) = match self.config.rule_for(table, &column.name) {
                    Some(rule) => (rule.sensitive, rule.strategy.unwrap_or(self.config.strategy)),
                    None => (column.sensitive, self.config.strategy),
                };

                if self.config.mask_undeclared_references && column.looks_like_reference() {
                    tracing::warn!(
                        table,
                        column = %column.name,
                        "Reference-like column has no declared relationship"
                    );
                    report.add_warning(format!(
                        "{table}.{} looks like a reference but has no declared relationship; masked through a fallback mapping",
                        column.name
                    ));
                    return ColumnPlan::Fallback;
                }

                if sensitive {
                    ColumnPlan::Sensitive(strategy)
                } else {
                    ColumnPlan::Keep
                }
            })
            .collect()
    }

    fn strategy(&self, strategy: MaskingStrategy) -> Result<&dyn ColumnMasker> {
        self.strategies
            .get(&strategy)
            .map(|s| s.as_ref())
            .ok_or_else(|| ReplicaError::Configuration(format!("No masker for {strategy:?}")))
    }

    fn strategy_label(&self, plan: ColumnPlan) -> &'static str {
        match plan {
            ColumnPlan::Sensitive(strategy) => self
                .strategies
                .get(&strategy)
                .map(|s| s.name())
                .unwrap_or("unknown"),
            ColumnPlan::Keep => "none",
            _ => "mapping",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::config::ColumnRule;
    use crate::domain::{ColumnDescriptor, ColumnType, Row};

    fn users_and_bookings() -> RelationalDataset {
        let users = TableDescriptor::new("users")
            .column(ColumnDescriptor::primary_key("id", ColumnType::Text))
            .column(ColumnDescriptor::new("email", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("country", ColumnType::Text));
        let bookings = TableDescriptor::new("bookings")
            .column(ColumnDescriptor::primary_key("id", ColumnType::Text))
            .column(ColumnDescriptor::new("user_id", ColumnType::Text).not_null())
            .foreign_key("user_id", "users", "id");

        RelationalDataset::new()
            .with_table(
                bookings,
                vec![
                    Row::new(vec!["b1".into(), "u1".into()]),
                    Row::new(vec!["b2".into(), "u1".into()]),
                ],
            )
            .with_table(
                users,
                vec![Row::new(vec!["u1".into(), "a@example.com".into(), "NO".into()])],
            )
    }

    #[test]
    fn test_engine_creation() {
        let engine = AnonymizationEngine::new(AnonymizationConfig::default());
        assert!(engine.is_ok());
        assert!(engine.unwrap().is_enabled());
    }

    #[test]
    fn test_references_follow_parent() {
        let engine = AnonymizationEngine::new(AnonymizationConfig::default()).unwrap();
        let outcome = engine.process(users_and_bookings(), MappingStore::new()).unwrap();

        let user = &outcome.dataset.table("users").unwrap().rows[0];
        let bookings = &outcome.dataset.table("bookings").unwrap().rows;
        assert_ne!(user.get(0), Some(&ColumnValue::from("u1")));
        assert_eq!(bookings[0].get(1), user.get(0));
        assert_eq!(bookings[1].get(1), user.get(0));
        assert_ne!(user.get(1), Some(&ColumnValue::from("a@example.com")));
        assert_eq!(user.get(2), Some(&ColumnValue::from("NO")));
    }

    #[test]
    fn test_serial_integer_keys_stay_referentially_intact() {
        let orders = TableDescriptor::new("orders")
            .column(ColumnDescriptor::primary_key("id", ColumnType::Integer))
            .column(ColumnDescriptor::new("total", ColumnType::Float));
        let order_lines = TableDescriptor::new("order_lines")
            .column(ColumnDescriptor::primary_key("id", ColumnType::Integer))
            .column(ColumnDescriptor::new("order_id", ColumnType::Integer).not_null())
            .foreign_key("order_id", "orders", "id");

        let order_rows = (10..=99)
            .map(|id| Row::new(vec![ColumnValue::Integer(id), ColumnValue::Float(25.0)]))
            .collect();
        let line_rows = (1..=300)
            .map(|id| Row::new(vec![ColumnValue::Integer(id), ColumnValue::Integer(10 + id % 90)]))
            .collect();
        let dataset = RelationalDataset::new()
            .with_table(orders, order_rows)
            .with_table(order_lines, line_rows);

        let engine = AnonymizationEngine::new(AnonymizationConfig::default()).unwrap();
        let outcome = engine.process(dataset, MappingStore::new()).unwrap();

        let masked_orders: HashSet<String> = outcome
            .dataset
            .table("orders")
            .unwrap()
            .column_values("id")
            .filter_map(|v| v.canonical_key())
            .collect();
        assert_eq!(masked_orders.len(), 90);

        let lines = outcome.dataset.table("order_lines").unwrap();
        assert_eq!(lines.rows.len(), 300);
        assert!(lines
            .column_values("order_id")
            .all(|v| v.canonical_key().is_some_and(|k| masked_orders.contains(&k))));

        let relationships = outcome.dataset.relationships();
        assert!(crate::anonymization::validate(&outcome.dataset, &relationships).is_valid);
    }

    #[test]
    fn test_table_order_is_preserved() {
        let engine = AnonymizationEngine::new(AnonymizationConfig::default()).unwrap();
        let outcome = engine.process(users_and_bookings(), MappingStore::new()).unwrap();
        let names: Vec<_> = outcome.dataset.tables.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["bookings", "users"]);
        assert_eq!(outcome.report.processing_order, vec!["users", "bookings"]);
    }

    #[test]
    fn test_dry_run_leaves_data_untouched() {
        let config = AnonymizationConfig {
            dry_run: true,
            ..AnonymizationConfig::default()
        };
        let engine = AnonymizationEngine::new(config).unwrap();
        let input = users_and_bookings();
        let outcome = engine.process(input.clone(), MappingStore::new()).unwrap();
        assert_eq!(outcome.dataset, input);
        assert!(outcome.store.is_empty());
        assert!(outcome.report.dry_run);
        assert_eq!(outcome.report.table("users").unwrap().column("email").unwrap().values_masked, 1);
    }

    #[test]
    fn test_rule_exempts_sensitive_column() {
        let mut config = AnonymizationConfig::default();
        config.rules.push(ColumnRule::new("users", "email").exempt());
        let engine = AnonymizationEngine::new(config).unwrap();
        let outcome = engine.process(users_and_bookings(), MappingStore::new()).unwrap();
        let user = &outcome.dataset.table("users").unwrap().rows[0];
        assert_eq!(user.get(1), Some(&ColumnValue::from("a@example.com")));
    }

    #[test]
    fn test_rule_selects_redaction() {
        let mut config = AnonymizationConfig::default();
        config
            .rules
            .push(ColumnRule::new("users", "email").with_strategy(MaskingStrategy::Redact));
        let engine = AnonymizationEngine::new(config).unwrap();
        let outcome = engine.process(users_and_bookings(), MappingStore::new()).unwrap();
        let user = &outcome.dataset.table("users").unwrap().rows[0];
        assert_eq!(user.get(1), Some(&ColumnValue::from("[EMAIL]")));
    }

    #[test]
    fn test_disabled_engine_returns_input() {
        let config = AnonymizationConfig {
            enabled: false,
            ..AnonymizationConfig::default()
        };
        let engine = AnonymizationEngine::new(config).unwrap();
        let input = users_and_bookings();
        let outcome = engine.process(input.clone(), MappingStore::new()).unwrap();
        assert_eq!(outcome.dataset, input);
        assert_eq!(outcome.report.warnings.len(), 1);
    }
}
