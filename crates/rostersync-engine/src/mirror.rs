//! Destination-side record filtering per mirror mode.
//!
//! Under mirror mode a run may only touch destination records it owns. The
//! ownership marker is the `externalKey` tag, since mirrored entities lack a
//! natural business key observable by the remote system. Group memberships
//! carry no tag of their own and are scoped by group instead.

use std::collections::HashSet;

use rostersync_core::config::MirrorMode;
use rostersync_core::record::{EntityKind, SyncRecord};

/// A filter deciding which destination-side records this run may touch.
///
/// Handed to the reconciliation engine in the run options; the engine calls
/// [`RecordFilter::retain`] for every destination record of the kind.
#[derive(Debug, Clone)]
pub enum RecordFilter {
    /// Ownership-tag filtering for mirrored kinds.
    Ownership(OwnershipFilter),
    /// Group-scoped filtering for mirrored group memberships.
    GroupScope(GroupScopeFilter),
}

impl RecordFilter {
    /// Decide whether a destination record is retained for sync/comparison.
    /// Greedy adoption marks the record `in_source` as a side effect.
    pub fn retain(&mut self, record: &mut SyncRecord) -> bool {
        match self {
            RecordFilter::Ownership(filter) => filter.retain(record),
            RecordFilter::GroupScope(filter) => filter.retain(record),
        }
    }
}

/// Ownership-tag filter implementing strict and greedy mirroring.
#[derive(Debug, Clone)]
pub struct OwnershipFilter {
    kind: EntityKind,
    mode: MirrorMode,
    tag: String,
    /// Natural keys of this run's source records, used for greedy adoption.
    source_keys: HashSet<String>,
    /// Natural keys adopted so far (greedy only).
    adopted: HashSet<String>,
}

impl OwnershipFilter {
    /// Create a filter for a kind.
    #[must_use]
    pub fn new(
        kind: EntityKind,
        mode: MirrorMode,
        tag: impl Into<String>,
        source_keys: HashSet<String>,
    ) -> Self {
        Self {
            kind,
            mode,
            tag: tag.into(),
            source_keys,
            adopted: HashSet::new(),
        }
    }

    /// Retain a destination record when this run owns it.
    ///
    /// Strict: only records whose `externalKey` starts with the tag.
    /// Greedy: additionally adopts records whose natural key matches a
    /// source record, flagging the destination side `in_source` here; the
    /// runner flags the source side after reconciliation via
    /// [`adopted_keys`](Self::adopted_keys).
    pub fn retain(&mut self, record: &mut SyncRecord) -> bool {
        if let Some(external_key) = &record.external_key {
            if external_key.starts_with(&self.tag) {
                return true;
            }
        }

        if self.mode == MirrorMode::Greedy {
            if let Some(key) = record.natural_key(self.kind) {
                if self.source_keys.contains(&key) {
                    record.in_source = true;
                    self.adopted.insert(key);
                    return true;
                }
            }
        }

        false
    }

    /// Natural keys adopted during greedy filtering.
    #[must_use]
    pub fn adopted_keys(&self) -> &HashSet<String> {
        &self.adopted
    }
}

/// Group-scoped filter for mirrored group memberships: a membership is kept
/// only when its group is present in the groups-to-sync sequence produced by
/// the group processor in the same run.
#[derive(Debug, Clone)]
pub struct GroupScopeFilter {
    groups: HashSet<String>,
}

impl GroupScopeFilter {
    /// Create a filter over this run's groups-to-sync.
    #[must_use]
    pub fn new(groups: HashSet<String>) -> Self {
        Self { groups }
    }

    /// Retain a membership when its group is synced this run.
    pub fn retain(&self, record: &SyncRecord) -> bool {
        record
            .get("group")
            .map(rostersync_core::value::FieldValue::to_plain_string)
            .is_some_and(|group| self.groups.contains(&group))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_strict_retains_only_tagged() {
        let mut filter = OwnershipFilter::new(
            EntityKind::Person,
            MirrorMode::Strict,
            "XMSYNC_",
            keys(&["mmcbride"]),
        );

        let mut owned = SyncRecord::new().with("targetName", "mmcbride");
        owned.external_key = Some("XMSYNC_mmcbride".to_string());
        assert!(filter.retain(&mut owned));

        // Matching natural key is not enough under strict mode.
        let mut untagged = SyncRecord::new().with("targetName", "mmcbride");
        assert!(!filter.retain(&mut untagged));

        let mut foreign = SyncRecord::new().with("targetName", "other");
        foreign.external_key = Some("HRSYNC_other".to_string());
        assert!(!filter.retain(&mut foreign));
    }

    #[test]
    fn test_greedy_adopts_by_natural_key() {
        let mut filter = OwnershipFilter::new(
            EntityKind::Person,
            MirrorMode::Greedy,
            "XMSYNC_",
            keys(&["mmcbride", "akaur"]),
        );

        let mut untagged = SyncRecord::new().with("targetName", "mmcbride");
        assert!(filter.retain(&mut untagged));
        assert!(untagged.in_source);
        assert!(filter.adopted_keys().contains("mmcbride"));

        let mut unmatched = SyncRecord::new().with("targetName", "stranger");
        assert!(!filter.retain(&mut unmatched));
        assert!(!unmatched.in_source);
    }

    #[test]
    fn test_greedy_still_retains_tagged() {
        let mut filter = OwnershipFilter::new(
            EntityKind::Site,
            MirrorMode::Greedy,
            "XMSYNC_",
            HashSet::new(),
        );
        let mut owned = SyncRecord::new().with("name", "Denver");
        owned.external_key = Some("XMSYNC_Denver".to_string());
        assert!(filter.retain(&mut owned));
        // Tag retention is not adoption.
        assert!(filter.adopted_keys().is_empty());
    }

    #[test]
    fn test_site_filter_uses_name() {
        let mut filter = OwnershipFilter::new(
            EntityKind::Site,
            MirrorMode::Greedy,
            "XMSYNC_",
            keys(&["Denver"]),
        );
        let mut site = SyncRecord::new().with("name", "Denver");
        assert!(filter.retain(&mut site));
    }

    #[test]
    fn test_group_scope_filter() {
        let filter = GroupScopeFilter::new(keys(&["Primary", "Backup"]));
        let member = SyncRecord::new().with("id", "mmcbride").with("group", "Primary");
        assert!(filter.retain(&member));

        let orphan = SyncRecord::new().with("id", "mmcbride").with("group", "Retired");
        assert!(!filter.retain(&orphan));

        let missing = SyncRecord::new().with("id", "mmcbride");
        assert!(!filter.retain(&missing));
    }
}
