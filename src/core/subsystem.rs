//! Built-in subsystem catalogue
//!
//! A subsystem is a group of related tables that is cloned as a unit. Each
//! built-in subsystem declares its tables, their sensitive columns and the
//! foreign keys between them.

use crate::domain::{ColumnDescriptor, ColumnType, FkRelationship, TableDescriptor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Specialized subsystems that can be cloned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    AuditTrail,
    Conversations,
    Reservations,
    Billing,
}

impl SubsystemKind {
    /// All built-in subsystems
    pub const ALL: [SubsystemKind; 4] = [
        SubsystemKind::AuditTrail,
        SubsystemKind::Conversations,
        SubsystemKind::Reservations,
        SubsystemKind::Billing,
    ];

    /// Stable identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            SubsystemKind::AuditTrail => "audit_trail",
            SubsystemKind::Conversations => "conversations",
            SubsystemKind::Reservations => "reservations",
            SubsystemKind::Billing => "billing",
        }
    }

    /// Table layout of this subsystem
    pub fn descriptor(&self) -> SubsystemDescriptor {
        let tables = match self {
            SubsystemKind::AuditTrail => audit_trail_tables(),
            SubsystemKind::Conversations => conversation_tables(),
            SubsystemKind::Reservations => reservation_tables(),
            SubsystemKind::Billing => billing_tables(),
        };
        SubsystemDescriptor { kind: *self, tables }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubsystemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "audit_trail" | "audit" => Ok(SubsystemKind::AuditTrail),
            "conversations" => Ok(SubsystemKind::Conversations),
            "reservations" => Ok(SubsystemKind::Reservations),
            "billing" => Ok(SubsystemKind::Billing),
            other => Err(format!("Unknown subsystem: {other}")),
        }
    }
}

/// Tables of a subsystem, in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemDescriptor {
    pub kind: SubsystemKind,
    pub tables: Vec<TableDescriptor>,
}

impl SubsystemDescriptor {
    /// Table names in declaration order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Union of the tables' foreign keys
    pub fn relationships(&self) -> Vec<FkRelationship> {
        self.tables
            .iter()
            .flat_map(|t| t.foreign_keys.iter().cloned())
            .collect()
    }

    /// Table by name
    pub fn table(&self, name: &str) -> Option<&TableDescriptor> {
        self.tables.iter().find(|t| t.name == name)
    }
}

fn id() -> ColumnDescriptor {
    ColumnDescriptor::primary_key("id", ColumnType::Uuid)
}

fn reference(name: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(name, ColumnType::Uuid).not_null()
}

fn reservation_tables() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::new("users")
            .column(id())
            .column(ColumnDescriptor::new("email", ColumnType::Text).not_null().sensitive())
            .column(ColumnDescriptor::new("full_name", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("phone", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("created_at", ColumnType::Timestamp)),
        TableDescriptor::new("rentals")
            .column(id())
            .column(reference("owner_id"))
            .column(ColumnDescriptor::new("title", ColumnType::Text))
            .column(ColumnDescriptor::new("base_price", ColumnType::Float).sensitive())
            .column(ColumnDescriptor::new("created_at", ColumnType::Timestamp))
            .foreign_key("owner_id", "users", "id"),
        TableDescriptor::new("bookings")
            .column(id())
            .column(reference("user_id"))
            .column(reference("rental_id"))
            .column(ColumnDescriptor::new("total_price", ColumnType::Float).sensitive())
            .column(ColumnDescriptor::new("start_date", ColumnType::Timestamp))
            .column(ColumnDescriptor::new("end_date", ColumnType::Timestamp))
            .foreign_key("user_id", "users", "id")
            .foreign_key("rental_id", "rentals", "id"),
    ]
}

fn conversation_tables() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::new("conversations")
            .column(id())
            .column(ColumnDescriptor::new("subject", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("created_at", ColumnType::Timestamp)),
        TableDescriptor::new("conversation_participants")
            .column(id())
            .column(reference("conversation_id"))
            .column(ColumnDescriptor::new("participant_email", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("joined_at", ColumnType::Timestamp))
            .foreign_key("conversation_id", "conversations", "id"),
        TableDescriptor::new("messages")
            .column(id())
            .column(reference("conversation_id"))
            .column(ColumnDescriptor::new("sender_name", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("body", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("sent_at", ColumnType::Timestamp))
            .foreign_key("conversation_id", "conversations", "id"),
    ]
}

fn billing_tables() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::new("invoices")
            .column(id())
            .column(ColumnDescriptor::new("customer_email", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("amount", ColumnType::Float))
            .column(ColumnDescriptor::new("status", ColumnType::Text))
            .column(ColumnDescriptor::new("issued_at", ColumnType::Timestamp)),
        TableDescriptor::new("payments")
            .column(id())
            .column(reference("invoice_id"))
            .column(ColumnDescriptor::new("amount", ColumnType::Float))
            .column(ColumnDescriptor::new("card_last4", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("paid_at", ColumnType::Timestamp))
            .foreign_key("invoice_id", "invoices", "id"),
        TableDescriptor::new("refunds")
            .column(id())
            .column(reference("payment_id"))
            .column(ColumnDescriptor::new("amount", ColumnType::Float))
            .column(ColumnDescriptor::new("reason", ColumnType::Text).sensitive())
            .foreign_key("payment_id", "payments", "id"),
    ]
}

fn audit_trail_tables() -> Vec<TableDescriptor> {
    vec![
        TableDescriptor::new("audit_events")
            .column(id())
            .column(ColumnDescriptor::new("actor_email", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("ip_address", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("action", ColumnType::Text).not_null())
            .column(ColumnDescriptor::new("occurred_at", ColumnType::Timestamp)),
        TableDescriptor::new("audit_event_changes")
            .column(id())
            .column(reference("event_id"))
            .column(ColumnDescriptor::new("field_name", ColumnType::Text))
            .column(ColumnDescriptor::new("old_value", ColumnType::Text).sensitive())
            .column(ColumnDescriptor::new("new_value", ColumnType::Text).sensitive())
            .foreign_key("event_id", "audit_events", "id"),
    ]
}
