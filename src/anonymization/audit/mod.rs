//! Audit logging module
//!
//! Provides structured audit logging for anonymization runs. Records carry
//! SHA-256 digests of source values, never the values themselves.

pub mod logger;

pub use logger::AuditLogger;
