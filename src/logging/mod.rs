//! Logging and observability
//!
//! This module provides structured logging with:
//! - Human-readable console output on stderr
//! - JSON-formatted log files with rotation
//! - Configurable log levels, overridable through `RUST_LOG`
//!
//! Masked and original column values are never logged; only table, column
//! and count fields are.
//!
//! # Example
//!
//! ```no_run
//! use replica::logging::init_logging;
//! use replica::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(subsystem = "billing", "Clone started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};
