//! Audit logger for anonymization runs

use crate::anonymization::report::{AnonymizationReport, ColumnReport};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use uuid::Uuid;

/// Audit log entry
#[derive(Debug, Serialize)]
struct AuditLogEntry<'a> {
    timestamp: String,
    run_id: String,
    dry_run: bool,
    rows_processed: usize,
    values_masked: usize,
    mapping_fingerprint: Option<&'a str>,
    warnings: usize,
    columns: Vec<AuditColumn<'a>>,
}

/// Audit column entry (digest only)
#[derive(Debug, Serialize)]
struct AuditColumn<'a> {
    table: &'a str,
    column: &'a str,
    treatment: String,
    strategy: &'a str,
    values_masked: usize,
    source_digest: &'a str,
}

impl<'a> AuditColumn<'a> {
    fn new(table: &'a str, column: &'a ColumnReport) -> Self {
        Self {
            table,
            column: &column.column,
            treatment: format!("{:?}", column.treatment),
            strategy: &column.strategy,
            values_masked: column.values_masked,
            source_digest: &column.source_digest,
        }
    }
}

/// Audit logger for anonymization runs
pub struct AuditLogger {
    log_path: PathBuf,
    json_format: bool,
    enabled: bool,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(log_path: PathBuf, json_format: bool, enabled: bool) -> Result<Self> {
        if enabled {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create audit log directory: {}", parent.display())
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
            enabled,
        })
    }

    /// Log a finished run; returns the generated run id
    pub fn log_run(&self, report: &AnonymizationReport) -> Result<Option<Uuid>> {
        if !self.enabled {
            return Ok(None);
        }

        let run_id = Uuid::new_v4();
        let entry = AuditLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            run_id: run_id.to_string(),
            dry_run: report.dry_run,
            rows_processed: report.total_rows(),
            values_masked: report.total_masked(),
            mapping_fingerprint: report.mapping_fingerprint.as_deref(),
            warnings: report.warnings.len(),
            columns: report
                .tables
                .iter()
                .flat_map(|t| t.columns.iter().map(move |c| AuditColumn::new(&t.table, c)))
                .collect(),
        };

        self.write_entry(&entry)?;
        Ok(Some(run_id))
    }

    /// Write an audit entry to the log file
    fn write_entry(&self, entry: &AuditLogEntry<'_>) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open audit log: {}", self.log_path.display()))?;

        if self.json_format {
            let json_line =
                serde_json::to_string(entry).context("Failed to serialize audit entry")?;
            writeln!(file, "{json_line}").context("Failed to write audit entry")?;
        } else {
            writeln!(
                file,
                "[{}] Run: {} | Rows: {} | Masked: {} | Dry run: {} | Warnings: {}",
                entry.timestamp,
                entry.run_id,
                entry.rows_processed,
                entry.values_masked,
                entry.dry_run,
                entry.warnings
            )
            .context("Failed to write audit entry")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::report::{ColumnTally, ColumnTreatment, TableReport};
    use tempfile::tempdir;

    fn report() -> AnonymizationReport {
        let mut report = AnonymizationReport::new(false);
        let mut table = TableReport::new("users", 1);
        let mut tally = ColumnTally::new("email", ColumnTreatment::Sensitive, "deterministic");
        tally.record("test@example.com");
        table.columns.push(tally.finish());
        report.tables.push(table);
        report.mapping_fingerprint = Some("abc123".to_string());
        report
    }

    #[test]
    fn test_audit_logger_creation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("audit.log");

        let logger = AuditLogger::new(log_path.clone(), true, true).unwrap();
        assert!(logger.enabled);
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    fn test_log_run_writes_digests_only() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), true, true).unwrap();

        let run_id = logger.log_run(&report()).unwrap();
        assert!(run_id.is_some());

        let content = std::fs::read_to_string(&log_path).unwrap();
        let entry: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(entry["values_masked"], 1);
        assert_eq!(entry["columns"][0]["table"], "users");
        assert_eq!(entry["columns"][0]["source_digest"].as_str().unwrap().len(), 64);
        assert!(!content.contains("test@example.com"));
    }

    #[test]
    fn test_plain_text_format() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), false, true).unwrap();
        logger.log_run(&report()).unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("Masked: 1"));
    }

    #[test]
    fn test_disabled_logger_writes_nothing() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let logger = AuditLogger::new(log_path.clone(), true, false).unwrap();
        assert!(logger.log_run(&report()).unwrap().is_none());
        assert!(!log_path.exists());
    }
}
