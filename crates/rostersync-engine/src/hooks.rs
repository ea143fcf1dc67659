//! Injected per-kind record transform hooks.
//!
//! A caller may customize each entity's records with a function value of
//! fixed signature, invoked synchronously at a single point per record:
//! after field resolution and before mirror tagging. The hook receives the
//! record, the source dataset built so far, and a destination-side snapshot
//! supplied by the caller (empty when none is available); its return value
//! replaces the record.

use rostersync_core::record::{EntityKind, SyncRecord, WorkingDataset};

/// A record transform hook.
pub type TransformHook =
    Box<dyn Fn(SyncRecord, &WorkingDataset, &WorkingDataset) -> SyncRecord + Send + Sync>;

/// Per-kind transform hooks for a run.
#[derive(Default)]
pub struct Hooks {
    person: Option<TransformHook>,
    device: Option<TransformHook>,
    group: Option<TransformHook>,
    group_membership: Option<TransformHook>,
    site: Option<TransformHook>,
}

impl Hooks {
    /// Create an empty hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hook for a kind.
    #[must_use]
    pub fn with(mut self, kind: EntityKind, hook: TransformHook) -> Self {
        match kind {
            EntityKind::Person => self.person = Some(hook),
            EntityKind::Device => self.device = Some(hook),
            EntityKind::Group => self.group = Some(hook),
            EntityKind::GroupMembership => self.group_membership = Some(hook),
            EntityKind::Site => self.site = Some(hook),
        }
        self
    }

    /// Get the hook for a kind.
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<&TransformHook> {
        match kind {
            EntityKind::Person => self.person.as_ref(),
            EntityKind::Device => self.device.as_ref(),
            EntityKind::Group => self.group.as_ref(),
            EntityKind::GroupMembership => self.group_membership.as_ref(),
            EntityKind::Site => self.site.as_ref(),
        }
    }

    /// Apply the kind's hook to a record, if one is set.
    #[must_use]
    pub fn apply(
        &self,
        kind: EntityKind,
        record: SyncRecord,
        source: &WorkingDataset,
        destination: &WorkingDataset,
    ) -> SyncRecord {
        match self.get(kind) {
            Some(hook) => hook(record, source, destination),
            None => record,
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("person", &self.person.is_some())
            .field("device", &self.device.is_some())
            .field("group", &self.group.is_some())
            .field("group_membership", &self.group_membership.is_some())
            .field("site", &self.site.is_some())
            .finish()
    }
}
