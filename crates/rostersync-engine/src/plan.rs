//! Run options, the run plan, and the consumed reconciler interface.
//!
//! The reconciliation engine itself (remote diffing, pagination, retry) is
//! an external collaborator; this module specifies only what it consumes
//! from a run and what it must produce back.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use rostersync_core::config::MirrorMode;
use rostersync_core::error::SyncResult;
use rostersync_core::record::{EntityKind, SyncRecord, WorkingDataset};

use crate::mirror::RecordFilter;
use crate::report::ValidationFinding;

/// Per-kind options handed to the reconciliation engine, emitted only for
/// kinds whose sync is enabled.
#[derive(Debug)]
pub struct RunOptions {
    /// The attributes the engine may touch on the remote system. Exactly
    /// the configured fields, plus `externalKey` under mirror mode.
    pub fields: Vec<String>,
    /// Mirror mode for the kind.
    pub mirror: MirrorMode,
    /// Comma-joined relation names the engine must expand when fetching
    /// destination records (e.g. `roles,supervisors`).
    pub embed: Option<String>,
    /// Destination-side retention filter, present under mirror mode.
    pub filter: Option<RecordFilter>,
}

/// Everything a run hands to the reconciliation engine, exactly once.
#[derive(Debug)]
pub struct RunPlan {
    /// Run identifier, for log correlation.
    pub run_id: Uuid,
    /// When dataset construction started.
    pub started_at: DateTime<Utc>,
    /// The normalized dataset: per-kind sync and removal sequences.
    pub dataset: WorkingDataset,
    /// Per-kind engine options.
    pub options: HashMap<EntityKind, RunOptions>,
    /// Advisory device format findings gathered while building the dataset.
    pub findings: Vec<ValidationFinding>,
}

/// One failed engine operation.
#[derive(Debug, Clone, Serialize)]
pub struct SyncFailure {
    /// The attempted operation (`create`, `update`, `remove`).
    pub operation: String,
    /// The engine's error text.
    pub error: String,
    /// The record the operation was applied to.
    pub object: SyncRecord,
}

/// Per-kind results produced by the reconciliation engine.
#[derive(Debug, Clone, Default, Serialize)]
pub struct KindOutcome {
    /// Records created on the destination.
    pub created: Vec<SyncRecord>,
    /// Records updated on the destination.
    pub updated: Vec<SyncRecord>,
    /// Records removed from the destination.
    pub removed: Vec<SyncRecord>,
    /// All records synced (created, updated, or already current).
    pub synced: Vec<SyncRecord>,
    /// Failed operations.
    pub errors: Vec<SyncFailure>,
}

/// Results for every kind the engine processed.
pub type EngineOutcome = HashMap<EntityKind, KindOutcome>;

/// The external reconciliation engine, as consumed by this crate.
///
/// Implementations receive the working dataset and the per-kind options and
/// apply the changes to their destination environment. Both are mutable:
/// greedy mirror filters record adoptions as they run, and engines flag the
/// matching source records via
/// [`WorkingDataset::mark_in_source`] so both sides carry the transient
/// `in_source` marker.
pub trait Reconciler {
    /// Reconcile the dataset against the destination.
    fn reconcile(
        &mut self,
        dataset: &mut WorkingDataset,
        options: &mut HashMap<EntityKind, RunOptions>,
    ) -> SyncResult<EngineOutcome>;
}

/// The final report of a completed run.
#[derive(Debug)]
pub struct RunReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// When dataset construction started.
    pub started_at: DateTime<Utc>,
    /// When the engine finished.
    pub completed_at: DateTime<Utc>,
    /// Per-kind engine results.
    pub outcome: EngineOutcome,
    /// Advisory device format findings.
    pub findings: Vec<ValidationFinding>,
}
