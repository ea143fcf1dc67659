//! Group membership processing.
//!
//! One input record expands into one membership per id in the (possibly
//! delimited) members column, each carrying the record's resolved group.
//! Memberships have no ownership tag; under mirror mode they are scoped to
//! the groups synced in the same run, which is why the group processor must
//! run first.

use tracing::info;

use rostersync_core::config::EntityConfig;
use rostersync_core::error::SyncResult;
use rostersync_core::expand::expand;
use rostersync_core::record::{EntityKind, RawRecord, SyncRecord, WorkingDataset};
use rostersync_core::resolve::resolve;

use super::{commit_record, ProcessorContext};

/// The membership field set is fixed; memberships never carry an
/// `externalKey`.
pub const FIELD_SET: &[&str] = &["id", "group"];

/// The attributes the reconciliation engine may touch for memberships.
#[must_use]
pub fn fields(_config: &EntityConfig) -> Vec<String> {
    FIELD_SET.iter().map(|name| (*name).to_string()).collect()
}

/// Process group membership input records into the dataset.
pub fn process(
    config: &EntityConfig,
    records: &[RawRecord],
    ctx: &ProcessorContext<'_>,
    dataset: &mut WorkingDataset,
) -> SyncResult<()> {
    dataset.ensure_kind(EntityKind::GroupMembership);

    let mut synced = 0usize;
    for raw in records {
        let group = config
            .field("group")
            .and_then(|spec| resolve(spec, raw))
            .filter(rostersync_core::value::FieldValue::is_truthy);

        let members = config.field("members").and_then(|spec| {
            let value = resolve(spec, raw);
            expand(value.as_ref(), spec.delimiter.as_deref())
        });
        let Some(members) = members else {
            continue;
        };

        for id in members {
            let mut record = SyncRecord::new().with("id", id);
            if let Some(group) = &group {
                record.set("group", group.clone());
            }

            let record =
                ctx.hooks
                    .apply(EntityKind::GroupMembership, record, dataset, ctx.destination);

            if commit_record(
                EntityKind::GroupMembership,
                record,
                raw,
                config,
                ctx.mirror_tag,
                dataset,
            ) {
                synced += 1;
            }
        }
    }

    info!(
        read = records.len(),
        synced,
        removed = dataset.remove_records(EntityKind::GroupMembership).len(),
        "processed group memberships"
    );
    Ok(())
}
