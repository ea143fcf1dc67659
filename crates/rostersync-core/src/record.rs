//! Entity kinds, sync records, and the per-run working dataset.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::value::FieldValue;

/// A raw input record as read from a `.json` or `.csv` file, before any
/// field resolution.
pub type RawRecord = HashMap<String, FieldValue>;

/// The five entity kinds handled by the transformation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A person in the notification directory.
    #[serde(rename = "person")]
    Person,
    /// A notification device owned by a person.
    #[serde(rename = "device")]
    Device,
    /// A notification group.
    #[serde(rename = "group")]
    Group,
    /// A person's membership in a group.
    #[serde(rename = "groupMembership")]
    GroupMembership,
    /// A physical site.
    #[serde(rename = "site")]
    Site,
}

/// Processing order for a run. Group membership must follow groups because
/// its mirror filtering reads the groups-to-sync sequence of the same run.
pub const PROCESSING_ORDER: [EntityKind; 5] = [
    EntityKind::Person,
    EntityKind::Device,
    EntityKind::Group,
    EntityKind::GroupMembership,
    EntityKind::Site,
];

impl EntityKind {
    /// Convert to string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Device => "device",
            EntityKind::Group => "group",
            EntityKind::GroupMembership => "groupMembership",
            EntityKind::Site => "site",
        }
    }

    /// The field holding this kind's natural key: the human-meaningful
    /// identifier used for ownership comparison. Sites have no target name,
    /// so their plain `name` serves instead.
    #[must_use]
    pub fn natural_key_field(&self) -> &'static str {
        match self {
            EntityKind::Site => "name",
            _ => "targetName",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "person" => Ok(EntityKind::Person),
            "device" => Ok(EntityKind::Device),
            "group" => Ok(EntityKind::Group),
            "groupMembership" => Ok(EntityKind::GroupMembership),
            "site" => Ok(EntityKind::Site),
            _ => Err(format!("Unknown entity kind: {s}")),
        }
    }
}

/// A normalized record ready for reconciliation.
///
/// Resolved field values live in a flat bag; one-time creation-only values
/// live in the `initial` sub-map and are never merged with the main values.
/// `external_key` is the ownership tag set under mirror mode. `in_source` is
/// a transient marker used only during greedy reconciliation and is never
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Resolved field name to value.
    #[serde(flatten)]
    values: HashMap<String, FieldValue>,
    /// One-time creation-only values, from `initial` field specs.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub initial: HashMap<String, FieldValue>,
    /// Ownership tag under mirror mode: `<mirrorTag><naturalKey>`.
    #[serde(
        rename = "externalKey",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub external_key: Option<String>,
    /// Transient greedy-adoption marker. Never persisted.
    #[serde(skip)]
    pub in_source: bool,
}

impl SyncRecord {
    /// Create a new empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Set a field using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a one-time creation-only value.
    pub fn set_initial(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.initial.insert(name.into(), value.into());
    }

    /// Get a field value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Get a single-valued string field.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Check if a field is present (populated fields are exactly the
    /// configured ones).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Remove a field.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    /// Get the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// This record's natural key for the given kind, rendered as text.
    #[must_use]
    pub fn natural_key(&self, kind: EntityKind) -> Option<String> {
        self.get(kind.natural_key_field())
            .filter(|v| v.is_truthy())
            .map(FieldValue::to_plain_string)
    }
}

/// The per-run working dataset: for each entity kind, an ordered sequence of
/// records to sync and an ordered sequence of records to remove.
///
/// A kind is absent until its processor runs; after that it is present even
/// when its sequences are empty. Insertion order is input-file order; only
/// device sequencing reorders anything.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkingDataset {
    sync: HashMap<EntityKind, Vec<SyncRecord>>,
    remove: HashMap<EntityKind, Vec<SyncRecord>>,
}

impl WorkingDataset {
    /// Create a new empty dataset.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a kind as processed, creating its (possibly empty) sequences.
    pub fn ensure_kind(&mut self, kind: EntityKind) {
        self.sync.entry(kind).or_default();
        self.remove.entry(kind).or_default();
    }

    /// Check whether a kind was processed this run.
    #[must_use]
    pub fn has_kind(&self, kind: EntityKind) -> bool {
        self.sync.contains_key(&kind)
    }

    /// Append a record to the sync sequence for a kind.
    pub fn push_sync(&mut self, kind: EntityKind, record: SyncRecord) {
        self.sync.entry(kind).or_default().push(record);
    }

    /// Append a record to the removal sequence for a kind.
    pub fn push_remove(&mut self, kind: EntityKind, record: SyncRecord) {
        self.remove.entry(kind).or_default().push(record);
    }

    /// Records to sync for a kind. Empty for unprocessed kinds.
    #[must_use]
    pub fn sync_records(&self, kind: EntityKind) -> &[SyncRecord] {
        self.sync.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Records to remove for a kind. Empty for unprocessed kinds.
    #[must_use]
    pub fn remove_records(&self, kind: EntityKind) -> &[SyncRecord] {
        self.remove.get(&kind).map_or(&[], Vec::as_slice)
    }

    /// Mutable access to the sync sequence for a kind, used for greedy
    /// adoption marking.
    pub fn sync_records_mut(&mut self, kind: EntityKind) -> Option<&mut Vec<SyncRecord>> {
        self.sync.get_mut(&kind)
    }

    /// The set of natural keys present in the sync sequence for a kind.
    #[must_use]
    pub fn natural_keys(&self, kind: EntityKind) -> HashSet<String> {
        self.sync_records(kind)
            .iter()
            .filter_map(|record| record.natural_key(kind))
            .collect()
    }

    /// Mark source records whose natural key was adopted during greedy
    /// reconciliation.
    pub fn mark_in_source(&mut self, kind: EntityKind, adopted: &HashSet<String>) {
        if let Some(records) = self.sync.get_mut(&kind) {
            for record in records {
                if let Some(key) = record.natural_key(kind) {
                    if adopted.contains(&key) {
                        record.in_source = true;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_roundtrip() {
        for kind in PROCESSING_ORDER {
            let parsed: EntityKind = kind.as_str().parse().unwrap();
            assert_eq!(kind, parsed);
        }
    }

    #[test]
    fn test_entity_kind_invalid() {
        let result: Result<EntityKind, _> = "widget".parse();
        assert!(result.is_err());
    }

    #[test]
    fn test_natural_key_field() {
        assert_eq!(EntityKind::Person.natural_key_field(), "targetName");
        assert_eq!(EntityKind::Device.natural_key_field(), "targetName");
        assert_eq!(EntityKind::Site.natural_key_field(), "name");
    }

    #[test]
    fn test_record_fields() {
        let mut record = SyncRecord::new().with("targetName", "mmcbride");
        record.set("status", "ACTIVE");
        record.set_initial("language", "en");

        assert_eq!(record.get_str("targetName"), Some("mmcbride"));
        assert!(record.has("status"));
        assert!(!record.has("language"));
        assert_eq!(
            record.initial.get("language"),
            Some(&FieldValue::from("en"))
        );
        assert_eq!(
            record.natural_key(EntityKind::Person),
            Some("mmcbride".to_string())
        );
    }

    #[test]
    fn test_in_source_not_serialized() {
        let mut record = SyncRecord::new().with("name", "HQ");
        record.in_source = true;
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("in_source"));
        assert!(!json.contains("inSource"));
    }

    #[test]
    fn test_dataset_empty_vs_absent() {
        let mut dataset = WorkingDataset::new();
        assert!(dataset.sync_records(EntityKind::Person).is_empty());

        dataset.ensure_kind(EntityKind::Person);
        assert!(dataset.sync_records(EntityKind::Person).is_empty());
        // Present-but-empty and absent are both empty slices, but only the
        // processed kind appears in the serialized dataset.
        let json = serde_json::to_value(&dataset).unwrap();
        assert!(json["sync"].get("person").is_some());
        assert!(json["sync"].get("group").is_none());
    }

    #[test]
    fn test_dataset_push_and_keys() {
        let mut dataset = WorkingDataset::new();
        dataset.push_sync(
            EntityKind::Group,
            SyncRecord::new().with("targetName", "Primary"),
        );
        dataset.push_sync(
            EntityKind::Group,
            SyncRecord::new().with("targetName", "Backup"),
        );
        dataset.push_remove(
            EntityKind::Group,
            SyncRecord::new().with("targetName", "Retired"),
        );

        assert_eq!(dataset.sync_records(EntityKind::Group).len(), 2);
        assert_eq!(dataset.remove_records(EntityKind::Group).len(), 1);
        let keys = dataset.natural_keys(EntityKind::Group);
        assert!(keys.contains("Primary"));
        assert!(keys.contains("Backup"));
        assert!(!keys.contains("Retired"));
    }

    #[test]
    fn test_mark_in_source() {
        let mut dataset = WorkingDataset::new();
        dataset.push_sync(
            EntityKind::Site,
            SyncRecord::new().with("name", "Denver"),
        );
        dataset.push_sync(
            EntityKind::Site,
            SyncRecord::new().with("name", "Boston"),
        );

        let adopted: HashSet<String> = ["Denver".to_string()].into_iter().collect();
        dataset.mark_in_source(EntityKind::Site, &adopted);

        let records = dataset.sync_records(EntityKind::Site);
        assert!(records[0].in_source);
        assert!(!records[1].in_source);
    }
}
