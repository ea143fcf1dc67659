//! Group processing.

use tracing::info;

use rostersync_core::config::EntityConfig;
use rostersync_core::error::SyncResult;
use rostersync_core::record::{EntityKind, RawRecord, WorkingDataset};

use super::{
    commit_record, configured_fields, embed_list, resolve_fields, resolve_list_field,
    with_external_key, ProcessorContext,
};

/// Fixed group field set, in emission order.
pub const FIELD_SET: &[&str] = &[
    "targetName",
    "description",
    "allowDuplicates",
    "useDefaultDevices",
    "observedByAll",
    "externallyOwned",
    "status",
    "site",
];

/// List-valued relations, expanded through the multi-value expander.
pub const LIST_FIELDS: &[&str] = &["supervisors", "observers"];

/// The attributes the reconciliation engine may touch for groups.
#[must_use]
pub fn fields(config: &EntityConfig) -> Vec<String> {
    let mut fields = configured_fields(FIELD_SET, config);
    fields.extend(configured_fields(LIST_FIELDS, config));
    with_external_key(fields, config)
}

/// Relations the engine must expand when fetching destination groups.
#[must_use]
pub fn embed(config: &EntityConfig) -> Option<String> {
    embed_list(LIST_FIELDS, config)
}

/// Process group input records into the dataset.
pub fn process(
    config: &EntityConfig,
    records: &[RawRecord],
    ctx: &ProcessorContext<'_>,
    dataset: &mut WorkingDataset,
) -> SyncResult<()> {
    dataset.ensure_kind(EntityKind::Group);

    let mut synced = 0usize;
    for raw in records {
        let mut record = resolve_fields(FIELD_SET, config, raw);
        for name in LIST_FIELDS {
            resolve_list_field(&mut record, name, config, raw);
        }

        let record = ctx
            .hooks
            .apply(EntityKind::Group, record, dataset, ctx.destination);

        if commit_record(EntityKind::Group, record, raw, config, ctx.mirror_tag, dataset) {
            synced += 1;
        }
    }

    info!(
        read = records.len(),
        synced,
        removed = dataset.remove_records(EntityKind::Group).len(),
        "processed groups"
    );
    Ok(())
}
