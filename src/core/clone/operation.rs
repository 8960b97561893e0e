//! Clone operation record and reporting
//!
//! A [`CloneOperation`] is the full account of one pipeline run: which phases
//! ran, what each counted, and every error and warning encountered.

use crate::anonymization::MappingSnapshot;
use crate::core::clone::phase::{ClonePhase, PhaseResult, PhaseStatus};
use crate::core::subsystem::SubsystemKind;
use crate::domain::{EnvironmentId, OperationId, ReplicaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a clone operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Preparing,
    SchemaPhase,
    FunctionsPhase,
    TriggersPhase,
    DataPhase,
    ValidationPhase,
    Succeeded,
    PartiallyFailed,
}

impl OperationStatus {
    /// Status while a phase is running
    pub fn running(phase: ClonePhase) -> Self {
        match phase {
            ClonePhase::Preparing => OperationStatus::Preparing,
            ClonePhase::Schema => OperationStatus::SchemaPhase,
            ClonePhase::Functions => OperationStatus::FunctionsPhase,
            ClonePhase::Triggers => OperationStatus::TriggersPhase,
            ClonePhase::Data => OperationStatus::DataPhase,
            ClonePhase::Validation => OperationStatus::ValidationPhase,
        }
    }

    /// Check if the operation has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::PartiallyFailed)
    }
}

/// Classification of a clone error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloneErrorKind {
    /// Blocked by the safety guard; aborts the remaining phases
    Safety,
    /// Backend or I/O failure
    Transport,
    /// Dangling reference found during validation
    Integrity,
    /// Invalid configuration or input
    Configuration,
    /// Run stopped by a shutdown signal
    Cancelled,
    /// Masking or mapping failure
    Anonymization,
}

impl CloneErrorKind {
    /// Classifies a crate error
    pub fn classify(error: &ReplicaError) -> Self {
        match error {
            ReplicaError::Safety(_) => CloneErrorKind::Safety,
            ReplicaError::Backend(_) | ReplicaError::Io(_) => CloneErrorKind::Transport,
            ReplicaError::Integrity(_) => CloneErrorKind::Integrity,
            ReplicaError::Configuration(_) | ReplicaError::Validation(_) => {
                CloneErrorKind::Configuration
            }
            ReplicaError::Cancelled(_) => CloneErrorKind::Cancelled,
            ReplicaError::Mapping(_) | ReplicaError::Serialization(_) => {
                CloneErrorKind::Anonymization
            }
            ReplicaError::Other(_) => CloneErrorKind::Transport,
        }
    }
}

/// Clone error with context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneError {
    /// Phase the error was raised in
    pub phase: ClonePhase,
    pub kind: CloneErrorKind,
    pub message: String,
    /// Optional context (e.g., table or statement name)
    pub context: Option<String>,
}

impl CloneError {
    /// Create a new clone error
    pub fn new(phase: ClonePhase, kind: CloneErrorKind, message: impl Into<String>) -> Self {
        Self {
            phase,
            kind,
            message: message.into(),
            context: None,
        }
    }

    /// Create a clone error from a crate error
    pub fn from_error(phase: ClonePhase, error: &ReplicaError) -> Self {
        Self::new(phase, CloneErrorKind::classify(error), error.to_string())
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Record of one clone run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneOperation {
    pub id: OperationId,
    pub subsystem: SubsystemKind,
    pub source_environment: EnvironmentId,
    pub target_environment: EnvironmentId,
    pub status: OperationStatus,
    /// One entry per phase, in execution order
    pub phases: Vec<PhaseResult>,
    /// True exactly when `errors` is empty; set once when the run finishes
    pub success: bool,
    pub errors: Vec<CloneError>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    /// Mappings produced by the data phase
    pub mapping_snapshot: Option<MappingSnapshot>,
}

impl CloneOperation {
    /// Create an operation in the preparing state
    pub fn new(
        subsystem: SubsystemKind,
        source_environment: EnvironmentId,
        target_environment: EnvironmentId,
    ) -> Self {
        Self {
            id: OperationId::generate(),
            subsystem,
            source_environment,
            target_environment,
            status: OperationStatus::Preparing,
            phases: Vec::new(),
            success: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            cancelled: false,
            mapping_snapshot: None,
        }
    }

    /// Add an error
    pub fn add_error(&mut self, error: CloneError) {
        self.errors.push(error);
    }

    /// Add a warning
    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Result of a phase, if it was recorded
    pub fn phase(&self, phase: ClonePhase) -> Option<&PhaseResult> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    /// Phases with the given status
    pub fn phases_with_status(&self, status: PhaseStatus) -> Vec<ClonePhase> {
        self.phases
            .iter()
            .filter(|p| p.status == status)
            .map(|p| p.phase)
            .collect()
    }

    /// Check if a safety error was recorded
    pub fn has_safety_error(&self) -> bool {
        self.errors.iter().any(|e| e.kind == CloneErrorKind::Safety)
    }

    /// Rows written (or planned) by the data phase
    pub fn rows_cloned(&self) -> usize {
        self.phase(ClonePhase::Data).map_or(0, |p| p.counters.rows)
    }

    /// Values masked by the data phase
    pub fn values_masked(&self) -> usize {
        self.phase(ClonePhase::Data).map_or(0, |p| p.counters.masked)
    }

    /// Duration of the run in milliseconds, once finished
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Fixes the terminal status; called once by the pipeline
    pub(crate) fn finish(&mut self) {
        self.success = self.errors.is_empty();
        self.status = if self.success {
            OperationStatus::Succeeded
        } else {
            OperationStatus::PartiallyFailed
        };
        self.completed_at = Some(Utc::now());
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            operation_id = %self.id,
            subsystem = %self.subsystem,
            source = %self.source_environment,
            target = %self.target_environment,
            status = ?self.status,
            rows = self.rows_cloned(),
            masked = self.values_masked(),
            cancelled = self.cancelled,
            duration_ms = self.duration_ms().unwrap_or(0),
            "Clone completed"
        );

        for phase in &self.phases {
            tracing::debug!(
                phase = %phase.phase,
                status = ?phase.status,
                duration_ms = phase.duration_ms,
                "Clone phase result"
            );
        }

        if !self.errors.is_empty() {
            tracing::warn!(
                error_count = self.errors.len(),
                "Clone completed with errors"
            );
            for error in &self.errors {
                tracing::warn!(
                    phase = %error.phase,
                    kind = ?error.kind,
                    message = %error.message,
                    context = error.context.as_deref().unwrap_or(""),
                    "Clone error"
                );
            }
        }

        for warning in &self.warnings {
            tracing::warn!(warning = %warning, "Clone warning");
        }
    }

    /// Human-readable summary for the console
    pub fn format_console(&self) -> String {
        let mut output = String::new();
        let headline = if self.success {
            "✅ Clone succeeded"
        } else {
            "⚠️  Clone partially failed"
        };
        output.push_str(&format!(
            "{headline}: {} ({} → {})\n",
            self.subsystem, self.source_environment, self.target_environment
        ));
        output.push_str(&format!("   Operation: {}\n", self.id));

        for phase in &self.phases {
            let marker = match phase.status {
                PhaseStatus::Completed => "✓",
                PhaseStatus::Failed => "✗",
                PhaseStatus::Skipped => "-",
            };
            let c = &phase.counters;
            output.push_str(&format!(
                "   {marker} {:<11} tables={} functions={} triggers={} rows={} masked={} ({}ms)\n",
                phase.phase.to_string(),
                c.tables,
                c.functions,
                c.triggers,
                c.rows,
                c.masked,
                phase.duration_ms
            ));
        }

        if self.cancelled {
            output.push_str("   Cancelled by shutdown signal\n");
        }
        if !self.errors.is_empty() {
            output.push_str(&format!("\n   Errors ({}):\n", self.errors.len()));
            for error in &self.errors {
                output.push_str(&format!(
                    "   - [{}] {:?}: {}\n",
                    error.phase, error.kind, error.message
                ));
            }
        }
        if !self.warnings.is_empty() {
            output.push_str(&format!("\n   Warnings ({}):\n", self.warnings.len()));
            for warning in &self.warnings {
                output.push_str(&format!("   - {warning}\n"));
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BackendError, SafetyError};

    fn operation() -> CloneOperation {
        CloneOperation::new(
            SubsystemKind::Billing,
            EnvironmentId::new("prod").unwrap(),
            EnvironmentId::new("dev").unwrap(),
        )
    }

    #[test]
    fn test_finish_without_errors_succeeds() {
        let mut op = operation();
        op.finish();
        assert!(op.success);
        assert_eq!(op.status, OperationStatus::Succeeded);
        assert!(op.completed_at.is_some());
        assert!(op.status.is_terminal());
    }

    #[test]
    fn test_finish_with_errors_is_partial() {
        let mut op = operation();
        op.add_error(CloneError::new(
            ClonePhase::Data,
            CloneErrorKind::Transport,
            "insert failed",
        ));
        op.finish();
        assert!(!op.success);
        assert_eq!(op.status, OperationStatus::PartiallyFailed);
    }

    #[test]
    fn test_warnings_do_not_affect_success() {
        let mut op = operation();
        op.add_warning("checkpoint not saved");
        op.finish();
        assert!(op.success);
    }

    #[test]
    fn test_classify() {
        let safety = ReplicaError::from(SafetyError::WritesDisabled {
            environment: "dev".into(),
        });
        assert_eq!(CloneErrorKind::classify(&safety), CloneErrorKind::Safety);

        let backend = ReplicaError::from(BackendError::Timeout("fetch".into()));
        assert_eq!(CloneErrorKind::classify(&backend), CloneErrorKind::Transport);

        let mapping = ReplicaError::Mapping("collision".into());
        assert_eq!(CloneErrorKind::classify(&mapping), CloneErrorKind::Anonymization);
    }

    #[test]
    fn test_console_format_lists_errors() {
        let mut op = operation();
        op.add_error(
            CloneError::new(ClonePhase::Schema, CloneErrorKind::Transport, "boom")
                .with_context("create_invoices"),
        );
        op.finish();
        let text = op.format_console();
        assert!(text.contains("partially failed"));
        assert!(text.contains("boom"));
    }
}
