//! Domain models and types for Replica.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Typed column values** ([`ColumnValue`], [`ColumnType`])
//! - **Schema metadata** ([`TableDescriptor`], [`ColumnDescriptor`], [`FkRelationship`])
//! - **Datasets** ([`RelationalDataset`], [`TableData`], [`Row`])
//! - **Environments** ([`Environment`], [`EnvironmentType`])
//! - **Strongly-typed identifiers** ([`EnvironmentId`], [`OperationId`])
//! - **Error types** ([`ReplicaError`], [`SafetyError`], [`BackendError`])
//! - **Result type alias** ([`Result`])
//!
//! # Building a dataset
//!
//! ```rust
//! use replica::domain::{ColumnDescriptor, ColumnType, ColumnValue, RelationalDataset, Row, TableDescriptor};
//!
//! let users = TableDescriptor::new("users")
//!     .column(ColumnDescriptor::primary_key("id", ColumnType::Text));
//! let bookings = TableDescriptor::new("bookings")
//!     .column(ColumnDescriptor::primary_key("id", ColumnType::Text))
//!     .column(ColumnDescriptor::new("user_id", ColumnType::Text))
//!     .foreign_key("user_id", "users", "id");
//!
//! let dataset = RelationalDataset::new()
//!     .with_table(users, vec![Row::new(vec![ColumnValue::from("u1")])])
//!     .with_table(bookings, vec![Row::new(vec![ColumnValue::from("b1"), ColumnValue::from("u1")])]);
//!
//! assert_eq!(dataset.relationships().len(), 1);
//! ```

pub mod dataset;
pub mod environment;
pub mod errors;
pub mod ids;
pub mod result;
pub mod table;
pub mod value;

// Re-export commonly used types for convenience
pub use dataset::{RelationalDataset, Row, TableData};
pub use environment::{Environment, EnvironmentType};
pub use errors::{BackendError, ReplicaError, SafetyError};
pub use ids::{EnvironmentId, OperationId};
pub use result::Result;
pub use table::{Cardinality, ColumnDescriptor, FkRelationship, TableDescriptor};
pub use value::{ColumnType, ColumnValue};
