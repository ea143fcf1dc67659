//! Entity processors.
//!
//! Five parallel pipelines sharing one shape: resolve each target field
//! through the Field Resolver, expand list fields, run entity-specific
//! extras, then tag (mirror mode) or route (deletion trigger) the record
//! into the working dataset. Differences live in the per-kind modules.

pub mod device;
pub mod group;
pub mod membership;
pub mod person;
pub mod site;

use rostersync_core::config::EntityConfig;
use rostersync_core::expand::expand;
use rostersync_core::record::{EntityKind, RawRecord, SyncRecord, WorkingDataset};
use rostersync_core::resolve::{resolve, resolve_initial};

use crate::hooks::Hooks;

/// Shared per-run context handed to every processor.
pub struct ProcessorContext<'a> {
    /// Ownership tag prefix for mirror mode.
    pub mirror_tag: &'a str,
    /// Caller-supplied transform hooks.
    pub hooks: &'a Hooks,
    /// Caller-supplied destination-side snapshot for the hooks.
    pub destination: &'a WorkingDataset,
}

/// Resolve a fixed field set (and its initial values) into a fresh record.
pub(crate) fn resolve_fields(
    field_set: &[&str],
    config: &EntityConfig,
    raw: &RawRecord,
) -> SyncRecord {
    let mut record = SyncRecord::new();
    for name in field_set {
        let Some(spec) = config.field(name) else {
            continue;
        };
        if let Some(value) = resolve(spec, raw) {
            record.set(*name, value);
        }
        if let Some(value) = resolve_initial(spec) {
            record.set_initial(*name, value);
        }
    }
    record
}

/// Resolve and expand a delimited list field into the record.
pub(crate) fn resolve_list_field(
    record: &mut SyncRecord,
    name: &str,
    config: &EntityConfig,
    raw: &RawRecord,
) {
    let Some(spec) = config.field(name) else {
        return;
    };
    let value = resolve(spec, raw);
    if let Some(items) = expand(value.as_ref(), spec.delimiter.as_deref()) {
        record.set(name, items);
    }
}

/// Check whether the deletion trigger routes this raw record to removal.
pub(crate) fn matches_delete(config: &EntityConfig, raw: &RawRecord) -> bool {
    let (Some(column), Some(sentinel)) = (&config.process_input, &config.process_delete_value)
    else {
        return false;
    };
    raw.get(column)
        .is_some_and(|value| value.to_plain_string() == *sentinel)
}

/// Tag or route a finished record into the dataset.
///
/// Under mirror mode the record gets its ownership tag and always syncs;
/// otherwise a matching deletion trigger routes it to removal and skips the
/// remaining steps. Configured `include` columns pass through verbatim on
/// the sync path.
///
/// Returns `true` when the record was routed to the sync sequence.
pub(crate) fn commit_record(
    kind: EntityKind,
    mut record: SyncRecord,
    raw: &RawRecord,
    config: &EntityConfig,
    mirror_tag: &str,
    dataset: &mut WorkingDataset,
) -> bool {
    if config.mirror_mode.is_enabled() {
        if let Some(key) = record.natural_key(kind) {
            record.external_key = Some(format!("{mirror_tag}{key}"));
        }
    } else if matches_delete(config, raw) {
        dataset.push_remove(kind, record);
        return false;
    }

    for column in &config.include {
        if let Some(value) = raw.get(column) {
            record.set(column.clone(), value.clone());
        }
    }

    dataset.push_sync(kind, record);
    true
}

/// Append `externalKey` to a field list under mirror mode.
pub(crate) fn with_external_key(mut fields: Vec<String>, config: &EntityConfig) -> Vec<String> {
    if config.mirror_mode.is_enabled() {
        fields.push("externalKey".to_string());
    }
    fields
}

/// The configured subset of a fixed field set, in declaration order.
pub(crate) fn configured_fields(field_set: &[&str], config: &EntityConfig) -> Vec<String> {
    field_set
        .iter()
        .filter(|name| config.is_field_configured(name))
        .map(|name| (*name).to_string())
        .collect()
}

/// Comma-join the configured relation names needing destination-side
/// expansion.
pub(crate) fn embed_list(relations: &[&str], config: &EntityConfig) -> Option<String> {
    let configured: Vec<&str> = relations
        .iter()
        .copied()
        .filter(|name| config.is_field_configured(name))
        .collect();
    if configured.is_empty() {
        None
    } else {
        Some(configured.join(","))
    }
}
