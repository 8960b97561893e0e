//! Anonymization run reporting
//!
//! A report summarizes what an engine run did per table and column. It never
//! contains source values; columns carry a SHA-256 digest of the values they
//! masked so two runs over the same data can be compared.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// How a column was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnTreatment {
    /// Primary key mapped through its own mapping
    PrimaryKey,
    /// Declared foreign key resolved through the referenced column
    ForeignKey,
    /// Undeclared reference-like column masked through a fallback mapping
    FallbackReference,
    /// Sensitive column masked by a strategy
    Sensitive,
}

/// Per-column statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnReport {
    pub column: String,
    pub treatment: ColumnTreatment,
    /// Strategy name, or `mapping` for key columns
    pub strategy: String,
    pub values_masked: usize,
    /// SHA-256 over the canonical source values in row order
    pub source_digest: String,
}

/// Accumulates a [`ColumnReport`] while a column is being masked
pub struct ColumnTally {
    report: ColumnReport,
    hasher: Sha256,
}

impl ColumnTally {
    /// Starts tallying a column
    pub fn new(
        column: impl Into<String>,
        treatment: ColumnTreatment,
        strategy: impl Into<String>,
    ) -> Self {
        Self {
            report: ColumnReport {
                column: column.into(),
                treatment,
                strategy: strategy.into(),
                values_masked: 0,
                source_digest: String::new(),
            },
            hasher: Sha256::new(),
        }
    }

    /// Records one masked source value (by its canonical key)
    pub fn record(&mut self, canonical_source: &str) {
        self.report.values_masked += 1;
        self.hasher.update(canonical_source.as_bytes());
        self.hasher.update([0x1f]);
    }

    /// Finalizes the source digest
    pub fn finish(self) -> ColumnReport {
        let mut report = self.report;
        report.source_digest = format!("{:x}", self.hasher.finalize());
        report
    }
}

/// Per-table statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<ColumnReport>,
}

impl TableReport {
    /// Creates an empty table report
    pub fn new(table: impl Into<String>, rows: usize) -> Self {
        Self {
            table: table.into(),
            rows,
            columns: Vec::new(),
        }
    }

    /// Values masked in this table
    pub fn values_masked(&self) -> usize {
        self.columns.iter().map(|c| c.values_masked).sum()
    }

    /// Column report by name
    pub fn column(&self, name: &str) -> Option<&ColumnReport> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Report of one engine run
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnonymizationReport {
    /// Whether the data was left untouched
    pub dry_run: bool,

    /// Tables in the order they were processed
    pub processing_order: Vec<String>,

    /// Relationships skipped for ordering, as `a.b -> c.d`
    pub skipped_edges: Vec<String>,

    pub tables: Vec<TableReport>,

    /// Configuration problems and fallbacks
    pub warnings: Vec<String>,

    /// Fingerprint of the mapping store after the run
    pub mapping_fingerprint: Option<String>,

    pub processing_time_ms: u64,
}

impl AnonymizationReport {
    /// Create a new empty report
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Add a warning (duplicates are dropped)
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Total rows processed
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// Total values masked
    pub fn total_masked(&self) -> usize {
        self.tables.iter().map(TableReport::values_masked).sum()
    }

    /// Table report by name
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// Format report for console output
    pub fn format_console(&self) -> String {
        let mut output = String::new();
        let rule = "───────────────────────────────────────────────────────────────\n";
        let banner = "═══════════════════════════════════════════════════════════════\n";

        output.push('\n');
        output.push_str(banner);
        if self.dry_run {
            output.push_str("                 ANONYMIZATION DRY-RUN REPORT                  \n");
        } else {
            output.push_str("                     ANONYMIZATION REPORT                      \n");
        }
        output.push_str(banner);
        output.push('\n');

        output.push_str("📊 SUMMARY\n");
        output.push_str(rule);
        output.push_str(&format!("  Tables Processed:   {}\n", self.tables.len()));
        output.push_str(&format!("  Rows Processed:     {}\n", self.total_rows()));
        output.push_str(&format!("  Values Masked:      {}\n", self.total_masked()));
        output.push_str(&format!("  Processing Time:    {} ms\n", self.processing_time_ms));
        if let Some(ref fingerprint) = self.mapping_fingerprint {
            output.push_str(&format!("  Mapping Fingerprint: {}\n", &fingerprint[..fingerprint.len().min(16)]));
        }
        output.push('\n');

        if !self.processing_order.is_empty() {
            output.push_str("🔗 PROCESSING ORDER\n");
            output.push_str(rule);
            output.push_str(&format!("  {}\n", self.processing_order.join(" → ")));
            output.push('\n');
        }

        if !self.tables.is_empty() {
            output.push_str("🔍 MASKED COLUMNS\n");
            output.push_str(rule);
            for table in &self.tables {
                for column in &table.columns {
                    output.push_str(&format!(
                        "  {:40} {:>8} ({})\n",
                        format!("{}.{}", table.table, column.column),
                        column.values_masked,
                        column.strategy
                    ));
                }
            }
            output.push('\n');
        }

        if !self.warnings.is_empty() {
            output.push_str("⚠️  WARNINGS\n");
            output.push_str(rule);
            for warning in &self.warnings {
                output.push_str(&format!("  • {warning}\n"));
            }
            output.push('\n');
        }

        output.push_str(banner);
        output.push('\n');
        output
    }

    /// Format report as JSON
    pub fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write report to file
    pub fn write_to_file(&self, path: &std::path::Path) -> std::io::Result<()> {
        let json = self.format_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> AnonymizationReport {
        let mut report = AnonymizationReport::new(false);
        report.processing_order = vec!["users".into(), "bookings".into()];
        let mut users = TableReport::new("users", 2);
        let mut email = ColumnTally::new("email", ColumnTreatment::Sensitive, "deterministic");
        email.record("a@example.com");
        email.record("b@example.com");
        users.columns.push(email.finish());
        report.tables.push(users);
        report
    }

    #[test]
    fn test_report_totals() {
        let report = sample_report();
        assert_eq!(report.total_rows(), 2);
        assert_eq!(report.total_masked(), 2);
        assert_eq!(report.table("users").unwrap().column("email").unwrap().values_masked, 2);
    }

    #[test]
    fn test_column_digest_is_stable_and_opaque() {
        let report = sample_report();
        let digest = &report.tables[0].columns[0].source_digest;
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, &sample_report().tables[0].columns[0].source_digest);

        let json = report.format_json().unwrap();
        assert!(!json.contains("a@example.com"));
    }

    #[test]
    fn test_warnings_are_deduplicated() {
        let mut report = AnonymizationReport::new(true);
        report.add_warning("x");
        report.add_warning("x");
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_format_console() {
        let mut report = sample_report();
        report.add_warning("bookings.legacy_id masked without a declared relationship");
        let output = report.format_console();
        assert!(output.contains("ANONYMIZATION REPORT"));
        assert!(output.contains("Rows Processed:     2"));
        assert!(output.contains("users → bookings"));
        assert!(output.contains("WARNINGS"));
        assert!(AnonymizationReport::new(true).format_console().contains("DRY-RUN"));
    }
}
