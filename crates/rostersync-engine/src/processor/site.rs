//! Site processing.
//!
//! Sites have no target name; their plain `name` is the natural key and the
//! source of the ownership tag under mirror mode.

use tracing::info;

use rostersync_core::config::EntityConfig;
use rostersync_core::error::SyncResult;
use rostersync_core::record::{EntityKind, RawRecord, WorkingDataset};

use super::{commit_record, configured_fields, resolve_fields, with_external_key, ProcessorContext};

/// Fixed site field set, in emission order.
pub const FIELD_SET: &[&str] = &[
    "name",
    "address1",
    "address2",
    "city",
    "country",
    "externallyOwned",
    "language",
    "latitude",
    "longitude",
    "postalCode",
    "state",
    "status",
    "timezone",
];

/// The attributes the reconciliation engine may touch for sites.
#[must_use]
pub fn fields(config: &EntityConfig) -> Vec<String> {
    with_external_key(configured_fields(FIELD_SET, config), config)
}

/// Process site input records into the dataset.
pub fn process(
    config: &EntityConfig,
    records: &[RawRecord],
    ctx: &ProcessorContext<'_>,
    dataset: &mut WorkingDataset,
) -> SyncResult<()> {
    dataset.ensure_kind(EntityKind::Site);

    let mut synced = 0usize;
    for raw in records {
        let record = resolve_fields(FIELD_SET, config, raw);
        let record = ctx
            .hooks
            .apply(EntityKind::Site, record, dataset, ctx.destination);

        if commit_record(EntityKind::Site, record, raw, config, ctx.mirror_tag, dataset) {
            synced += 1;
        }
    }

    info!(
        read = records.len(),
        synced,
        removed = dataset.remove_records(EntityKind::Site).len(),
        "processed sites"
    );
    Ok(())
}
