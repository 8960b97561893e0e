//! Clone orchestration
//!
//! This module drives a subsystem clone from a source environment into a
//! target environment through the schema, functions, triggers, data and
//! validation phases.

pub mod operation;
pub mod options;
pub mod phase;
pub mod pipeline;

pub use operation::{CloneError, CloneErrorKind, CloneOperation, OperationStatus};
pub use options::CloneOptions;
pub use phase::{ClonePhase, PhaseCounters, PhaseResult, PhaseStatus};
pub use pipeline::ClonePipeline;
