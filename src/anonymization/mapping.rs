//! ID mapping store
//!
//! Holds one bijection per `table.column` key from original key values to their
//! masked counterparts. Foreign keys are resolved through the mapping of the
//! column they reference, so a parent's primary key and every child reference to
//! it receive the same masked value.
//!
//! The store is a plain value: it is passed into an engine run, returned from it
//! and can be exported as a [`MappingSnapshot`] to resume a clone later without
//! re-randomizing identifiers.

use crate::anonymization::masker::{integer_band, DeterministicMasker};
use crate::domain::{ColumnValue, FkRelationship, ReplicaError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// Salts tried before a mapping gives up on finding a free masked value
const MAX_SALT_ATTEMPTS: u32 = 64;

/// Longest chain of key-to-key references followed during resolution
const MAX_REFERENCE_DEPTH: usize = 16;

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Builds the `table.column` key used for mappings and masking contexts
pub fn mapping_key(table: &str, column: &str) -> String {
    format!("{table}.{column}")
}

/// Bijection from original values to masked values for one column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdMapping {
    forward: BTreeMap<String, ColumnValue>,
    /// Canonical keys of masked values already handed out
    #[serde(skip)]
    used: HashSet<String>,
}

impl IdMapping {
    fn new() -> Self {
        Self::default()
    }

    /// Masked value for an original value
    pub fn get(&self, original: &ColumnValue) -> Option<&ColumnValue> {
        original
            .canonical_key()
            .and_then(|key| self.forward.get(&key))
    }

    /// Number of mapped values
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// True when nothing is mapped yet
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterates `(original canonical key, masked value)` pairs in key order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ColumnValue)> {
        self.forward.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the existing masked value or masks the original under `context`,
    /// re-salting until the masked value is unused
    fn get_or_mask(
        &mut self,
        original: &ColumnValue,
        masker: &DeterministicMasker,
        context: &str,
    ) -> Result<ColumnValue> {
        let Some(key) = original.canonical_key() else {
            return Ok(ColumnValue::Null);
        };
        if let Some(existing) = self.forward.get(&key) {
            return Ok(existing.clone());
        }

        for salt in 0..MAX_SALT_ATTEMPTS {
            let candidate = masker.mask_salted(original, context, salt);
            let Some(candidate_key) = candidate.canonical_key() else {
                continue;
            };
            if self.used.insert(candidate_key) {
                if salt > 0 {
                    tracing::warn!(
                        mapping = context,
                        salt,
                        "Masked value collision resolved by re-salting"
                    );
                }
                self.forward.insert(key, candidate.clone());
                return Ok(candidate);
            }
        }

        if let ColumnValue::Integer(value) = original {
            if let Some(masked) = self.probe_integer_band(*value, masker, context) {
                tracing::warn!(
                    mapping = context,
                    "Masked value collision resolved by probing the integer band"
                );
                self.forward.insert(key, masked.clone());
                return Ok(masked);
            }
            return Err(ReplicaError::Mapping(format!(
                "Integer band of {value} is exhausted for '{context}'"
            )));
        }

        Err(ReplicaError::Mapping(format!(
            "No free masked value for '{context}' after {MAX_SALT_ATTEMPTS} attempts"
        )))
    }

    /// Walks the band from the unsalted candidate to the next unused slot
    ///
    /// The original's own slot is taken only when nothing else is free.
    fn probe_integer_band(
        &mut self,
        original: i64,
        masker: &DeterministicMasker,
        context: &str,
    ) -> Option<ColumnValue> {
        let (low, high) = integer_band(original)?;
        let ColumnValue::Integer(start) = masker.mask(&ColumnValue::Integer(original), context)
        else {
            return None;
        };
        let (low, high, start) = (i128::from(low), i128::from(high), i128::from(start));
        let span = high - low + 1;
        // Every occupied slot can be stepped over at most once
        let limit = span.min(self.used.len() as i128 + 2);

        let mut own_slot_free = false;
        for step in 1..=limit {
            let slot = low + (start - low + step).rem_euclid(span);
            let candidate = ColumnValue::Integer(slot as i64);
            let Some(candidate_key) = candidate.canonical_key() else {
                continue;
            };
            if self.used.contains(&candidate_key) {
                continue;
            }
            if slot == i128::from(original) {
                own_slot_free = true;
                continue;
            }
            self.used.insert(candidate_key);
            return Some(candidate);
        }

        if own_slot_free {
            let candidate = ColumnValue::Integer(original);
            self.used.insert(candidate.canonical_key()?);
            return Some(candidate);
        }
        None
    }

    /// Records a masked value produced elsewhere (a referenced column's mapping)
    fn record(&mut self, original: &ColumnValue, masked: ColumnValue) {
        if let Some(key) = original.canonical_key() {
            if let Some(masked_key) = masked.canonical_key() {
                self.used.insert(masked_key);
            }
            self.forward.entry(key).or_insert(masked);
        }
    }

    fn rebuild_used(&mut self) -> std::result::Result<(), String> {
        self.used.clear();
        for masked in self.forward.values() {
            if let Some(key) = masked.canonical_key() {
                if !self.used.insert(key.clone()) {
                    return Err(format!("masked value '{key}' is assigned twice"));
                }
            }
        }
        Ok(())
    }
}

/// How a reference value was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The original value was null and stays null
    Null,
    /// Resolved through the mapping of the referenced column
    Mapped {
        value: ColumnValue,
        mapping: String,
    },
    /// No relationship is declared; masked under the source column's own mapping
    Fallback {
        value: ColumnValue,
        mapping: String,
    },
}

impl Resolution {
    /// The resolved value
    pub fn value(&self) -> &ColumnValue {
        match self {
            Resolution::Null => &ColumnValue::Null,
            Resolution::Mapped { value, .. } | Resolution::Fallback { value, .. } => value,
        }
    }

    /// Consumes the resolution, returning the value
    pub fn into_value(self) -> ColumnValue {
        match self {
            Resolution::Null => ColumnValue::Null,
            Resolution::Mapped { value, .. } | Resolution::Fallback { value, .. } => value,
        }
    }

    /// True when the fallback path was taken
    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }
}

/// Serializable export of a [`MappingStore`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    /// `table.column` -> original canonical key -> masked value
    pub mappings: BTreeMap<String, BTreeMap<String, ColumnValue>>,
}

impl MappingSnapshot {
    /// Total number of mapped values across all columns
    pub fn entry_count(&self) -> usize {
        self.mappings.values().map(BTreeMap::len).sum()
    }
}

/// Store of all ID mappings for one engine run
///
/// # Examples
///
/// ```
/// use replica::anonymization::mapping::MappingStore;
/// use replica::anonymization::masker::DeterministicMasker;
/// use replica::domain::{ColumnValue, FkRelationship};
///
/// let masker = DeterministicMasker::default();
/// let mut store = MappingStore::new();
/// store
///     .create_mapping("users", "id", &[ColumnValue::from("u1")], &masker)
///     .unwrap();
///
/// let fks = vec![FkRelationship::new("bookings", "user_id", "users", "id")];
/// let resolved = store
///     .resolve(&ColumnValue::from("u1"), "bookings", "user_id", &fks, &masker)
///     .unwrap();
/// assert_eq!(
///     Some(resolved.value()),
///     store.lookup("users", "id", &ColumnValue::from("u1"))
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappingStore {
    mappings: BTreeMap<String, IdMapping>,
}

impl MappingStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Masks each observed value of `table.column` into its mapping
    ///
    /// Values that are already mapped keep their existing masked value; nulls
    /// are skipped.
    pub fn create_mapping(
        &mut self,
        table: &str,
        column: &str,
        original_ids: &[ColumnValue],
        masker: &DeterministicMasker,
    ) -> Result<&IdMapping> {
        let key = mapping_key(table, column);
        let mapping = self.mappings.entry(key.clone()).or_insert_with(IdMapping::new);
        for original in original_ids {
            mapping.get_or_mask(original, masker, &key)?;
        }
        tracing::debug!(mapping = %key, entries = mapping.len(), "Mapping populated");
        Ok(mapping)
    }

    /// Resolves a reference value through the relationship declared for
    /// `source_table.source_column`
    ///
    /// With a relationship the value is mapped through the referenced column's
    /// mapping, creating the entry on demand. Without one the value is masked
    /// under a mapping keyed by the source column and flagged as a fallback.
    pub fn resolve(
        &mut self,
        original: &ColumnValue,
        source_table: &str,
        source_column: &str,
        relationships: &[FkRelationship],
        masker: &DeterministicMasker,
    ) -> Result<Resolution> {
        if original.is_null() {
            return Ok(Resolution::Null);
        }

        let relationship = relationships
            .iter()
            .find(|fk| fk.source_table == source_table && fk.source_column == source_column);

        match relationship {
            Some(fk) => {
                let value = self.map_through(
                    original,
                    &fk.target_table,
                    &fk.target_column,
                    relationships,
                    masker,
                    0,
                )?;
                Ok(Resolution::Mapped {
                    value,
                    mapping: mapping_key(&fk.target_table, &fk.target_column),
                })
            }
            None => {
                let key = mapping_key(source_table, source_column);
                let value = self
                    .mappings
                    .entry(key.clone())
                    .or_insert_with(IdMapping::new)
                    .get_or_mask(original, masker, &key)?;
                Ok(Resolution::Fallback {
                    value,
                    mapping: key,
                })
            }
        }
    }

    /// Maps a key value of `table.column` itself
    ///
    /// When the column is also the source of a relationship (a primary key
    /// shared with its parent) the value is mapped through the parent and
    /// recorded under this column too.
    pub fn map_value(
        &mut self,
        original: &ColumnValue,
        table: &str,
        column: &str,
        relationships: &[FkRelationship],
        masker: &DeterministicMasker,
    ) -> Result<ColumnValue> {
        if original.is_null() {
            return Ok(ColumnValue::Null);
        }
        self.map_through(original, table, column, relationships, masker, 0)
    }

    /// Maps a value into `table.column`, following the column's own reference
    /// when it is itself a foreign key (shared one-to-one identities)
    fn map_through(
        &mut self,
        original: &ColumnValue,
        table: &str,
        column: &str,
        relationships: &[FkRelationship],
        masker: &DeterministicMasker,
        depth: usize,
    ) -> Result<ColumnValue> {
        let key = mapping_key(table, column);
        if let Some(existing) = self.mappings.get(&key).and_then(|m| m.get(original)) {
            return Ok(existing.clone());
        }

        let next = relationships.iter().find(|fk| {
            fk.source_table == table && fk.source_column == column && !fk.is_self_reference()
        });

        match next {
            Some(fk) if depth < MAX_REFERENCE_DEPTH => {
                let value = self.map_through(
                    original,
                    &fk.target_table,
                    &fk.target_column,
                    relationships,
                    masker,
                    depth + 1,
                )?;
                self.mappings
                    .entry(key)
                    .or_insert_with(IdMapping::new)
                    .record(original, value.clone());
                Ok(value)
            }
            _ => self
                .mappings
                .entry(key.clone())
                .or_insert_with(IdMapping::new)
                .get_or_mask(original, masker, &key),
        }
    }

    /// Masked value recorded for an original value of `table.column`
    pub fn lookup(&self, table: &str, column: &str, original: &ColumnValue) -> Option<&ColumnValue> {
        self.mappings
            .get(&mapping_key(table, column))
            .and_then(|m| m.get(original))
    }

    /// Mapping for `table.column`
    pub fn mapping(&self, table: &str, column: &str) -> Option<&IdMapping> {
        self.mappings.get(&mapping_key(table, column))
    }

    /// `table.column` keys with a mapping, in sorted order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.mappings.keys().map(String::as_str)
    }

    /// Number of mappings
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// True when no mapping exists
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Total number of mapped values
    pub fn entry_count(&self) -> usize {
        self.mappings.values().map(IdMapping::len).sum()
    }

    /// Exports all mappings
    pub fn export(&self) -> MappingSnapshot {
        MappingSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            mappings: self
                .mappings
                .iter()
                .map(|(key, mapping)| (key.clone(), mapping.forward.clone()))
                .collect(),
        }
    }

    /// Merges a snapshot into the store
    ///
    /// Entries already present in the store win. Fails when the snapshot would
    /// assign one masked value to two originals of the same column.
    pub fn import(&mut self, snapshot: MappingSnapshot) -> Result<()> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(ReplicaError::Mapping(format!(
                "Unsupported snapshot version {} (max {SNAPSHOT_VERSION})",
                snapshot.version
            )));
        }

        for (key, entries) in snapshot.mappings {
            let mapping = self.mappings.entry(key.clone()).or_insert_with(IdMapping::new);
            for (original, masked) in entries {
                mapping.forward.entry(original).or_insert(masked);
            }
            mapping
                .rebuild_used()
                .map_err(|e| ReplicaError::Mapping(format!("Mapping '{key}': {e}")))?;
        }

        tracing::info!(
            mappings = self.len(),
            entries = self.entry_count(),
            "Mapping snapshot imported"
        );
        Ok(())
    }

    /// Builds a store from a snapshot
    pub fn from_snapshot(snapshot: MappingSnapshot) -> Result<Self> {
        let mut store = Self::new();
        store.import(snapshot)?;
        Ok(store)
    }

    /// Serializes the store as a pretty-printed snapshot
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    /// Restores a store from [`to_json`](Self::to_json) output
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: MappingSnapshot = serde_json::from_str(json)
            .map_err(|e| ReplicaError::Mapping(format!("Invalid mapping snapshot: {e}")))?;
        Self::from_snapshot(snapshot)
    }

    /// SHA-256 over the canonical JSON of all mappings (export time excluded)
    pub fn fingerprint(&self) -> String {
        let forward: BTreeMap<&String, &BTreeMap<String, ColumnValue>> = self
            .mappings
            .iter()
            .map(|(key, mapping)| (key, &mapping.forward))
            .collect();
        let canonical = serde_json::to_vec(&forward).unwrap_or_default();
        format!("{:x}", Sha256::digest(&canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masker() -> DeterministicMasker {
        DeterministicMasker::default()
    }

    fn fks() -> Vec<FkRelationship> {
        vec![
            FkRelationship::new("bookings", "user_id", "users", "id"),
            FkRelationship::new("profiles", "user_id", "users", "id"),
            FkRelationship::new("avatars", "profile_id", "profiles", "user_id"),
        ]
    }

    #[test]
    fn test_create_mapping_is_idempotent() {
        let mut store = MappingStore::new();
        let ids = vec![ColumnValue::from("u1"), ColumnValue::from("u2"), ColumnValue::Null];
        store.create_mapping("users", "id", &ids, &masker()).unwrap();
        let first = store.lookup("users", "id", &ids[0]).cloned();
        store.create_mapping("users", "id", &ids, &masker()).unwrap();

        assert_eq!(store.mapping("users", "id").unwrap().len(), 2);
        assert_eq!(store.lookup("users", "id", &ids[0]).cloned(), first);
        assert_eq!(store.lookup("users", "id", &ColumnValue::Null), None);
    }

    #[test]
    fn test_resolve_uses_target_mapping() {
        let mut store = MappingStore::new();
        let u1 = ColumnValue::from("u1");
        store.create_mapping("users", "id", &[u1.clone()], &masker()).unwrap();

        let resolution = store
            .resolve(&u1, "bookings", "user_id", &fks(), &masker())
            .unwrap();
        assert!(!resolution.is_fallback());
        assert_eq!(Some(resolution.value()), store.lookup("users", "id", &u1));
    }

    #[test]
    fn test_on_demand_resolution_matches_prepopulation() {
        let u9 = ColumnValue::from("u9");

        let mut lazy = MappingStore::new();
        let child_first = lazy
            .resolve(&u9, "bookings", "user_id", &fks(), &masker())
            .unwrap();

        let mut eager = MappingStore::new();
        eager.create_mapping("users", "id", &[u9.clone()], &masker()).unwrap();

        assert_eq!(Some(child_first.value()), eager.lookup("users", "id", &u9));
    }

    #[test]
    fn test_resolve_follows_shared_identity() {
        let mut store = MappingStore::new();
        let u1 = ColumnValue::from("u1");
        store.create_mapping("users", "id", &[u1.clone()], &masker()).unwrap();

        let via_profile = store
            .resolve(&u1, "avatars", "profile_id", &fks(), &masker())
            .unwrap();
        assert_eq!(Some(via_profile.value()), store.lookup("users", "id", &u1));
        assert_eq!(
            store.lookup("profiles", "user_id", &u1),
            store.lookup("users", "id", &u1)
        );
    }

    #[test]
    fn test_map_value_for_shared_primary_key() {
        let mut store = MappingStore::new();
        let u1 = ColumnValue::from("u1");
        let profile_key = store
            .map_value(&u1, "profiles", "user_id", &fks(), &masker())
            .unwrap();
        assert_eq!(Some(&profile_key), store.lookup("users", "id", &u1));
        assert_eq!(Some(&profile_key), store.lookup("profiles", "user_id", &u1));
    }

    #[test]
    fn test_resolve_without_relationship_falls_back() {
        let mut store = MappingStore::new();
        let value = ColumnValue::from("x-1");
        let resolution = store
            .resolve(&value, "orders", "legacy_id", &fks(), &masker())
            .unwrap();
        assert!(resolution.is_fallback());
        assert!(store.lookup("orders", "legacy_id", &value).is_some());
    }

    #[test]
    fn test_resolve_null() {
        let mut store = MappingStore::new();
        let resolution = store
            .resolve(&ColumnValue::Null, "bookings", "user_id", &fks(), &masker())
            .unwrap();
        assert_eq!(resolution, Resolution::Null);
        assert!(store.is_empty());
    }

    #[test]
    fn test_mapping_is_bijective() {
        let mut store = MappingStore::new();
        let ids: Vec<ColumnValue> = (1..=500).map(ColumnValue::Integer).collect();
        store.create_mapping("items", "id", &ids, &masker()).unwrap();

        let mapping = store.mapping("items", "id").unwrap();
        let distinct: HashSet<String> = mapping
            .entries()
            .filter_map(|(_, v)| v.canonical_key())
            .collect();
        assert_eq!(distinct.len(), 500);
    }

    fn assert_bijective_in_band(table: &str, ids: &[ColumnValue]) {
        let mut store = MappingStore::new();
        store.create_mapping(table, "id", ids, &masker()).unwrap();

        let mapping = store.mapping(table, "id").unwrap();
        let mut distinct = HashSet::new();
        for original in ids {
            let (ColumnValue::Integer(o), Some(ColumnValue::Integer(m))) = (original, mapping.get(original))
            else {
                panic!("{original:?} was not mapped to an integer");
            };
            assert_eq!(integer_band(*o), integer_band(*m), "{o} -> {m} left its band");
            assert!(distinct.insert(*m), "{m} assigned twice");
        }
    }

    #[test]
    fn test_dense_two_digit_keys_fill_their_band() {
        let ids: Vec<ColumnValue> = (10..=99).map(ColumnValue::Integer).collect();
        assert_bijective_in_band("items", &ids);
    }

    #[test]
    fn test_serial_keys_across_bands() {
        let ids: Vec<ColumnValue> = (1..=1000).map(ColumnValue::Integer).collect();
        assert_bijective_in_band("orders", &ids);
    }

    #[test]
    fn test_single_digit_keys_form_a_permutation() {
        let ids: Vec<ColumnValue> = (1..=9).map(ColumnValue::Integer).collect();
        let mut store = MappingStore::new();
        store.create_mapping("ratings", "id", &ids, &masker()).unwrap();

        let mut masked: Vec<i64> = ids
            .iter()
            .filter_map(|id| match store.lookup("ratings", "id", id) {
                Some(ColumnValue::Integer(m)) => Some(*m),
                _ => None,
            })
            .collect();
        masked.sort_unstable();
        assert_eq!(masked, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_snapshot_roundtrip_keeps_fingerprint() {
        let mut store = MappingStore::new();
        store
            .create_mapping("users", "id", &[ColumnValue::from("u1")], &masker())
            .unwrap();
        let json = store.to_json().unwrap();
        let restored = MappingStore::from_json(&json).unwrap();
        assert_eq!(store.fingerprint(), restored.fingerprint());
        assert_eq!(restored.entry_count(), 1);
    }

    #[test]
    fn test_import_rejects_duplicate_masked_values() {
        let mut mappings = BTreeMap::new();
        mappings.insert(
            "users.id".to_string(),
            BTreeMap::from([
                ("a".to_string(), ColumnValue::from("z")),
                ("b".to_string(), ColumnValue::from("z")),
            ]),
        );
        let snapshot = MappingSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            mappings,
        };
        assert!(MappingStore::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_imported_entries_are_reused() {
        let mut first = MappingStore::new();
        let u1 = ColumnValue::from("u1");
        first.create_mapping("users", "id", &[u1.clone()], &masker()).unwrap();

        let mut second = MappingStore::from_snapshot(first.export()).unwrap();
        second
            .create_mapping("users", "id", &[u1.clone(), ColumnValue::from("u2")], &masker())
            .unwrap();
        assert_eq!(second.lookup("users", "id", &u1), first.lookup("users", "id", &u1));
    }
}
