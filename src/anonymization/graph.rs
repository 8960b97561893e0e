//! Relationship graph resolver
//!
//! Orders tables so that every referenced table is processed before the tables
//! referencing it. Cycles and self references cannot be ordered; the edges that
//! close them are reported as skipped and resolved just in time by the mapping
//! store instead.

use crate::domain::FkRelationship;
use std::collections::{HashMap, HashSet};

/// Result of ordering a set of tables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingOrder {
    /// Table names, referenced tables first
    pub tables: Vec<String>,
    /// Relationships ignored for ordering because they close a cycle or point
    /// back at their own table
    pub skipped_edges: Vec<FkRelationship>,
}

impl ProcessingOrder {
    /// Position of a table in the order
    pub fn position(&self, table: &str) -> Option<usize> {
        self.tables.iter().position(|t| t == table)
    }

    /// True when no edge had to be skipped
    pub fn is_acyclic(&self) -> bool {
        self.skipped_edges.iter().all(FkRelationship::is_self_reference)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Computes a dependency-respecting processing order
///
/// Depth-first: for every relationship `X -> Y` between known tables, `Y` comes
/// before `X` unless the edge closes a cycle. Ties keep declaration order, so
/// the result is deterministic. Edges to unknown tables are ignored.
///
/// # Examples
///
/// ```
/// use replica::anonymization::graph::order;
/// use replica::domain::FkRelationship;
///
/// let fks = vec![FkRelationship::new("bookings", "user_id", "users", "id")];
/// let result = order(&["bookings", "users"], &fks);
/// assert_eq!(result.tables, vec!["users", "bookings"]);
/// ```
pub fn order<S: AsRef<str>>(tables: &[S], relationships: &[FkRelationship]) -> ProcessingOrder {
    let known: HashSet<&str> = tables.iter().map(AsRef::as_ref).collect();

    let mut outgoing: HashMap<&str, Vec<&FkRelationship>> = HashMap::new();
    for fk in relationships {
        outgoing.entry(fk.source_table.as_str()).or_default().push(fk);
    }

    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut result = ProcessingOrder::default();

    for table in tables {
        visit(table.as_ref(), &known, &outgoing, &mut marks, &mut result);
    }

    if !result.skipped_edges.is_empty() {
        tracing::debug!(
            skipped = result.skipped_edges.len(),
            "Relationship graph contains cycles or self references"
        );
    }
    result
}

fn visit<'a>(
    table: &'a str,
    known: &HashSet<&'a str>,
    outgoing: &HashMap<&'a str, Vec<&'a FkRelationship>>,
    marks: &mut HashMap<&'a str, Mark>,
    result: &mut ProcessingOrder,
) {
    if marks.contains_key(table) {
        return;
    }
    marks.insert(table, Mark::Visiting);

    for fk in outgoing.get(table).into_iter().flatten() {
        let target = fk.target_table.as_str();
        if !known.contains(target) {
            continue;
        }
        if target == table {
            result.skipped_edges.push((*fk).clone());
            continue;
        }
        match marks.get(target) {
            Some(Mark::Visiting) => result.skipped_edges.push((*fk).clone()),
            Some(Mark::Done) => {}
            None => visit(target, known, outgoing, marks, result),
        }
    }

    marks.insert(table, Mark::Done);
    result.tables.push(table.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parents_come_first() {
        let fks = vec![
            FkRelationship::new("bookings", "user_id", "users", "id"),
            FkRelationship::new("bookings", "rental_id", "rentals", "id"),
            FkRelationship::new("rentals", "owner_id", "users", "id"),
        ];
        let result = order(&["bookings", "rentals", "users"], &fks);
        assert_eq!(result.tables, vec!["users", "rentals", "bookings"]);
        assert!(result.skipped_edges.is_empty());
        assert!(result.is_acyclic());
    }

    #[test]
    fn test_independent_tables_keep_declaration_order() {
        let result = order(&["c", "a", "b"], &[]);
        assert_eq!(result.tables, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cycle_is_tolerated() {
        let fks = vec![
            FkRelationship::new("a", "b_id", "b", "id"),
            FkRelationship::new("b", "a_id", "a", "id"),
        ];
        let result = order(&["a", "b"], &fks);
        assert_eq!(result.tables, vec!["b", "a"]);
        assert_eq!(result.skipped_edges, vec![fks[1].clone()]);
        assert!(!result.is_acyclic());
    }

    #[test]
    fn test_self_reference_is_skipped() {
        let fks = vec![FkRelationship::new("employees", "manager_id", "employees", "id")];
        let result = order(&["employees"], &fks);
        assert_eq!(result.tables, vec!["employees"]);
        assert_eq!(result.skipped_edges.len(), 1);
        assert!(result.is_acyclic());
    }

    #[test]
    fn test_unknown_targets_are_ignored() {
        let fks = vec![FkRelationship::new("orders", "customer_id", "customers", "id")];
        let result = order(&["orders"], &fks);
        assert_eq!(result.tables, vec!["orders"]);
        assert!(result.skipped_edges.is_empty());
    }

    #[test]
    fn test_position() {
        let fks = vec![FkRelationship::new("b", "a_id", "a", "id")];
        let result = order(&["b", "a"], &fks);
        assert!(result.position("a") < result.position("b"));
        assert_eq!(result.position("missing"), None);
    }
}
