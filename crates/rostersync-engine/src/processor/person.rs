//! Person processing.
//!
//! People carry the largest field set, optional role/supervisor lists,
//! independently-resolved custom properties, and optionally feed automatic
//! site creation.

use std::collections::HashMap;

use tracing::{debug, info};

use rostersync_core::config::PersonConfig;
use rostersync_core::error::SyncResult;
use rostersync_core::expand::expand;
use rostersync_core::record::{EntityKind, RawRecord, SyncRecord, WorkingDataset};
use rostersync_core::value::FieldValue;

use super::{
    commit_record, configured_fields, embed_list, resolve_fields, resolve_list_field,
    with_external_key, ProcessorContext,
};

/// Fixed person field set, in emission order.
pub const FIELD_SET: &[&str] = &[
    "targetName",
    "firstName",
    "externallyOwned",
    "lastName",
    "language",
    "phoneLogin",
    "phonePin",
    "site",
    "status",
    "timezone",
    "webLogin",
    "licenseType",
];

/// List-valued relations, expanded through the multi-value expander.
pub const LIST_FIELDS: &[&str] = &["roles", "supervisors"];

/// The attributes the reconciliation engine may touch for people.
#[must_use]
pub fn fields(config: &PersonConfig) -> Vec<String> {
    let mut fields = configured_fields(FIELD_SET, &config.base);
    fields.extend(configured_fields(LIST_FIELDS, &config.base));
    if !config.properties.is_empty() {
        fields.push("properties".to_string());
    }
    with_external_key(fields, &config.base)
}

/// Relations the engine must expand when fetching destination people.
#[must_use]
pub fn embed(config: &PersonConfig) -> Option<String> {
    embed_list(LIST_FIELDS, &config.base)
}

/// Process person input records into the dataset.
pub fn process(
    config: &PersonConfig,
    records: &[RawRecord],
    ctx: &ProcessorContext<'_>,
    dataset: &mut WorkingDataset,
) -> SyncResult<()> {
    dataset.ensure_kind(EntityKind::Person);

    let mut synced = 0usize;
    for raw in records {
        let mut record = resolve_fields(FIELD_SET, &config.base, raw);
        for name in LIST_FIELDS {
            resolve_list_field(&mut record, name, &config.base, raw);
        }
        if !config.properties.is_empty() {
            record.set("properties", FieldValue::Map(resolve_properties(config, raw)));
        }

        let record = ctx
            .hooks
            .apply(EntityKind::Person, record, dataset, ctx.destination);

        let will_remove =
            !config.base.mirror_mode.is_enabled() && super::matches_delete(&config.base, raw);
        if config.create_sites && !will_remove {
            collect_site(&record, dataset);
        }

        if commit_record(
            EntityKind::Person,
            record,
            raw,
            &config.base,
            ctx.mirror_tag,
            dataset,
        ) {
            synced += 1;
        }
    }

    info!(
        read = records.len(),
        synced,
        removed = dataset.remove_records(EntityKind::Person).len(),
        "processed people"
    );
    Ok(())
}

/// Resolve the configured custom properties for one record.
fn resolve_properties(config: &PersonConfig, raw: &RawRecord) -> HashMap<String, FieldValue> {
    let mut properties = HashMap::new();
    for spec in &config.properties {
        let value = raw
            .get(&spec.input)
            .filter(|value| value.is_truthy())
            .cloned()
            .or_else(|| spec.default_value.clone());
        let Some(value) = value else {
            continue;
        };
        let value = match spec.delimiter.as_deref() {
            Some(delimiter) => match expand(Some(&value), Some(delimiter)) {
                Some(items) => FieldValue::List(items),
                None => continue,
            },
            None => value,
        };
        properties.insert(spec.target_name().to_string(), value);
    }
    properties
}

/// Append this person's site as a minimal site record, once per distinct
/// name.
fn collect_site(record: &SyncRecord, dataset: &mut WorkingDataset) {
    let Some(site) = record.get("site").filter(|value| value.is_truthy()) else {
        return;
    };
    let name = site.to_plain_string();
    dataset.ensure_kind(EntityKind::Site);
    if dataset.natural_keys(EntityKind::Site).contains(&name) {
        return;
    }
    debug!(site = %name, "creating site from person record");
    dataset.push_sync(EntityKind::Site, SyncRecord::new().with("name", name));
}
