//! Clone phases and per-phase results

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phases of a clone, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClonePhase {
    Preparing,
    Schema,
    Functions,
    Triggers,
    Data,
    Validation,
}

impl ClonePhase {
    /// Phases after preparation, in order
    pub const WORK: [ClonePhase; 5] = [
        ClonePhase::Schema,
        ClonePhase::Functions,
        ClonePhase::Triggers,
        ClonePhase::Data,
        ClonePhase::Validation,
    ];

    /// Operation name passed to the safety guard for write phases
    pub fn write_operation(&self) -> Option<&'static str> {
        match self {
            ClonePhase::Schema => Some("apply_schema"),
            ClonePhase::Functions => Some("apply_functions"),
            ClonePhase::Triggers => Some("apply_triggers"),
            ClonePhase::Data => Some("insert_rows"),
            ClonePhase::Preparing | ClonePhase::Validation => None,
        }
    }
}

impl fmt::Display for ClonePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ClonePhase::Preparing => "preparing",
            ClonePhase::Schema => "schema",
            ClonePhase::Functions => "functions",
            ClonePhase::Triggers => "triggers",
            ClonePhase::Data => "data",
            ClonePhase::Validation => "validation",
        };
        write!(f, "{label}")
    }
}

/// Outcome of one phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Completed,
    Failed,
    Skipped,
}

/// Work counted by a phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounters {
    pub tables: usize,
    pub functions: usize,
    pub triggers: usize,
    pub rows: usize,
    pub masked: usize,
}

/// Result of one phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseResult {
    pub phase: ClonePhase,
    pub status: PhaseStatus,
    /// Zero unless the phase completed
    pub counters: PhaseCounters,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl PhaseResult {
    /// A completed phase
    pub fn completed(phase: ClonePhase, counters: PhaseCounters, duration_ms: u64) -> Self {
        Self {
            phase,
            status: PhaseStatus::Completed,
            counters,
            duration_ms,
            errors: Vec::new(),
        }
    }

    /// A failed phase; its counters stay at zero
    pub fn failed(phase: ClonePhase, errors: Vec<String>, duration_ms: u64) -> Self {
        Self {
            phase,
            status: PhaseStatus::Failed,
            counters: PhaseCounters::default(),
            duration_ms,
            errors,
        }
    }

    /// A phase that never ran
    pub fn skipped(phase: ClonePhase) -> Self {
        Self {
            phase,
            status: PhaseStatus::Skipped,
            counters: PhaseCounters::default(),
            duration_ms: 0,
            errors: Vec::new(),
        }
    }
}
