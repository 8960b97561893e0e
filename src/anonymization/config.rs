//! Anonymization configuration

use crate::anonymization::strategy::MaskingStrategy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-column masking rule
///
/// Rules override the `sensitive` flag of table descriptors: a rule with
/// `sensitive = false` leaves a descriptor-flagged column untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub table: String,
    pub column: String,

    /// Strategy for this column (defaults to the configured strategy)
    #[serde(default)]
    pub strategy: Option<MaskingStrategy>,

    #[serde(default = "default_true")]
    pub sensitive: bool,
}

impl ColumnRule {
    /// Creates a sensitive-column rule using the default strategy
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            strategy: None,
            sensitive: true,
        }
    }

    /// Sets the strategy for this column
    pub fn with_strategy(mut self, strategy: MaskingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Marks the column as not sensitive
    pub fn exempt(mut self) -> Self {
        self.sensitive = false;
        self
    }

    fn matches(&self, table: &str, column: &str) -> bool {
        self.table == table && self.column == column
    }
}

/// Anonymization engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// Enable/disable anonymization
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default strategy for sensitive columns
    #[serde(default)]
    pub strategy: MaskingStrategy,

    /// Dry-run mode (report what would be masked, leave data untouched)
    #[serde(default)]
    pub dry_run: bool,

    /// Mask undeclared `*_id` columns through a per-column fallback mapping
    #[serde(default = "default_true")]
    pub mask_undeclared_references: bool,

    /// Maximum timestamp shift in days
    #[serde(default = "default_timestamp_window_days")]
    pub timestamp_window_days: u32,

    /// Per-column overrides
    #[serde(default)]
    pub rules: Vec<ColumnRule>,

    /// Audit logging configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_true() -> bool {
    true
}

fn default_timestamp_window_days() -> u32 {
    30
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: MaskingStrategy::Deterministic,
            dry_run: false,
            mask_undeclared_references: true,
            timestamp_window_days: default_timestamp_window_days(),
            rules: Vec::new(),
            audit: AuditConfig::default(),
        }
    }
}

impl AnonymizationConfig {
    /// Rule declared for `table.column`
    pub fn rule_for(&self, table: &str, column: &str) -> Option<&ColumnRule> {
        self.rules.iter().find(|r| r.matches(table, column))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.timestamp_window_days > 3650 {
            anyhow::bail!(
                "timestamp_window_days must be at most 3650, got {}",
                self.timestamp_window_days
            );
        }

        for rule in &self.rules {
            if rule.table.trim().is_empty() || rule.column.trim().is_empty() {
                anyhow::bail!("Masking rules require both table and column");
            }
        }

        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if !seen.insert((rule.table.as_str(), rule.column.as_str())) {
                anyhow::bail!("Duplicate masking rule for {}.{}", rule.table, rule.column);
            }
        }

        self.audit.validate().context("Invalid audit configuration")?;

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("REPLICA_ANONYMIZATION_ENABLED") {
            self.enabled = val
                .parse()
                .context("Invalid REPLICA_ANONYMIZATION_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("REPLICA_ANONYMIZATION_STRATEGY") {
            self.strategy = val
                .parse()
                .map_err(|e: String| anyhow::anyhow!("Invalid REPLICA_ANONYMIZATION_STRATEGY: {e}"))?;
        }

        if let Ok(val) = std::env::var("REPLICA_ANONYMIZATION_DRY_RUN") {
            self.dry_run = val
                .parse()
                .context("Invalid REPLICA_ANONYMIZATION_DRY_RUN value")?;
        }

        if let Ok(val) = std::env::var("REPLICA_ANONYMIZATION_MASK_UNDECLARED_REFERENCES") {
            self.mask_undeclared_references = val
                .parse()
                .context("Invalid REPLICA_ANONYMIZATION_MASK_UNDECLARED_REFERENCES value")?;
        }

        self.audit.apply_env_overrides()?;

        Ok(())
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default)]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON format for audit logs
    #[serde(default = "default_true")]
    pub json_format: bool,
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/anonymization.log")
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: default_audit_log_path(),
            json_format: true,
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("Audit log path cannot be empty when audit logging is enabled");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("REPLICA_ANONYMIZATION_AUDIT_ENABLED") {
            self.enabled = val
                .parse()
                .context("Invalid REPLICA_ANONYMIZATION_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("REPLICA_ANONYMIZATION_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("REPLICA_ANONYMIZATION_AUDIT_JSON_FORMAT") {
            self.json_format = val
                .parse()
                .context("Invalid REPLICA_ANONYMIZATION_AUDIT_JSON_FORMAT value")?;
        }

        Ok(())
    }
}
