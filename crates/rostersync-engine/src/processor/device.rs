//! Device processing.
//!
//! One input record fans out into N device records, one per configured
//! device sub-spec whose input column is populated. Each device belongs to
//! an owner and gets a synthesized target name of `<owner>|<deviceName>`.
//! Optional per-owner dense re-sequencing and advisory format validation
//! run on the fanned-out list before routing.

use tracing::{info, warn};

use rostersync_core::config::DevicesConfig;
use rostersync_core::error::SyncResult;
use rostersync_core::record::{EntityKind, RawRecord, SyncRecord, WorkingDataset};
use rostersync_core::resolve::resolve;
use rostersync_core::value::FieldValue;

use super::{commit_record, matches_delete, with_external_key, ProcessorContext};
use crate::report::{check_device, ValidationFinding};

/// Device type whose value column maps to `emailAddress`; every other type
/// maps to `phoneNumber`.
pub const EMAIL_TYPE: &str = "EMAIL";

/// The attributes the reconciliation engine may touch for devices.
#[must_use]
pub fn fields(config: &DevicesConfig) -> Vec<String> {
    let mut fields = vec![
        "targetName".to_string(),
        "deviceType".to_string(),
        "owner".to_string(),
    ];
    if config.devices.iter().any(|spec| spec.kind() == EMAIL_TYPE) {
        fields.push("emailAddress".to_string());
    }
    if config.devices.iter().any(|spec| spec.kind() != EMAIL_TYPE) {
        fields.push("phoneNumber".to_string());
    }
    if config.delay_sync && config.devices.iter().any(|spec| spec.delay.is_some()) {
        fields.push("delay".to_string());
    }
    if config.sequence_sync {
        fields.push("sequence".to_string());
    }
    if config.priority_threshold_sync
        && config
            .devices
            .iter()
            .any(|spec| spec.priority_threshold.is_some())
    {
        fields.push("priorityThreshold".to_string());
    }
    if config.externally_owned_sync
        && config
            .devices
            .iter()
            .any(|spec| spec.externally_owned.is_some())
    {
        fields.push("externallyOwned".to_string());
    }
    with_external_key(fields, &config.base)
}

/// Process device input records into the dataset.
///
/// Format findings accumulate into the run-owned `findings` vector.
pub fn process(
    config: &DevicesConfig,
    records: &[RawRecord],
    ctx: &ProcessorContext<'_>,
    dataset: &mut WorkingDataset,
    findings: &mut Vec<ValidationFinding>,
) -> SyncResult<()> {
    dataset.ensure_kind(EntityKind::Device);

    let mut synced = 0usize;
    for raw in records {
        let owner = config
            .owner
            .as_ref()
            .and_then(|spec| resolve(spec, raw))
            .filter(FieldValue::is_truthy);
        let Some(owner) = owner else {
            warn!("skipping device record without a resolvable owner");
            continue;
        };
        let owner = owner.to_plain_string();

        let mut fanout = fan_out(config, raw, &owner);
        if config.sequence_sync {
            densify_sequence(&mut fanout);
        }

        let will_remove = !config.base.mirror_mode.is_enabled() && matches_delete(&config.base, raw);
        for record in fanout {
            let record = ctx
                .hooks
                .apply(EntityKind::Device, record, dataset, ctx.destination);
            if config.validate && !will_remove {
                check_device(&record, findings);
            }
            if commit_record(
                EntityKind::Device,
                record,
                raw,
                &config.base,
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
        removed = dataset.remove_records(EntityKind::Device).len(),
        findings = findings.len(),
        "processed devices"
    );
    Ok(())
}

/// Build the device records for one input record: one per sub-spec whose
/// input column is populated.
fn fan_out(config: &DevicesConfig, raw: &RawRecord, owner: &str) -> Vec<SyncRecord> {
    let mut fanout = Vec::new();
    for spec in &config.devices {
        let Some(value) = raw.get(&spec.input).filter(|value| value.is_truthy()) else {
            continue;
        };

        let mut record = SyncRecord::new();
        record.set("targetName", format!("{owner}|{}", spec.device_name()));
        record.set("owner", owner);
        record.set("deviceType", spec.kind());
        let value_field = if spec.kind() == EMAIL_TYPE {
            "emailAddress"
        } else {
            "phoneNumber"
        };
        record.set(value_field, value.clone());

        let optional: [(bool, Option<&rostersync_core::config::FieldSpec>, &str); 4] = [
            (config.delay_sync, spec.delay.as_ref(), "delay"),
            (config.sequence_sync, spec.sequence.as_ref(), "sequence"),
            (
                config.priority_threshold_sync,
                spec.priority_threshold.as_ref(),
                "priorityThreshold",
            ),
            (
                config.externally_owned_sync,
                spec.externally_owned.as_ref(),
                "externallyOwned",
            ),
        ];
        for (enabled, attr_spec, name) in optional {
            if !enabled {
                continue;
            }
            if let Some(value) = attr_spec.and_then(|attr_spec| resolve(attr_spec, raw)) {
                record.set(name, value);
            }
        }

        fanout.push(record);
    }
    fanout
}

/// Sort a record's fanned-out devices by their current sequence value
/// (records without one sort last, ties keep original order) and reassign
/// dense integers starting at 1.
fn densify_sequence(fanout: &mut Vec<SyncRecord>) {
    fanout.sort_by_key(|record| {
        let sequence = record.get("sequence").and_then(FieldValue::as_int);
        (sequence.is_none(), sequence.unwrap_or(0))
    });
    for (position, record) in fanout.iter_mut().enumerate() {
        record.set("sequence", (position + 1) as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::Hooks;
    use rostersync_core::config::{DeviceSpec, FieldSpec, MirrorMode};

    fn raw(entries: &[(&str, &str)]) -> RawRecord {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), FieldValue::from(*v)))
            .collect()
    }

    fn email_spec(input: &str) -> DeviceSpec {
        DeviceSpec {
            input: input.to_string(),
            ..DeviceSpec::default()
        }
    }

    fn phone_spec(input: &str, name: &str) -> DeviceSpec {
        DeviceSpec {
            input: input.to_string(),
            name: Some(name.to_string()),
            device_type: Some("VOICE".to_string()),
            ..DeviceSpec::default()
        }
    }

    fn base_config() -> DevicesConfig {
        DevicesConfig {
            owner: Some(FieldSpec::from_input("User")),
            devices: vec![email_spec("Work Email"), phone_spec("Cell", "Mobile Phone")],
            ..DevicesConfig::default()
        }
    }

    fn run(config: &DevicesConfig, records: &[RawRecord]) -> (WorkingDataset, Vec<ValidationFinding>) {
        let hooks = Hooks::new();
        let destination = WorkingDataset::new();
        let ctx = ProcessorContext {
            mirror_tag: "XMSYNC_",
            hooks: &hooks,
            destination: &destination,
        };
        let mut dataset = WorkingDataset::new();
        let mut findings = Vec::new();
        process(config, records, &ctx, &mut dataset, &mut findings).unwrap();
        (dataset, findings)
    }

    #[test]
    fn test_fan_out_skips_empty_columns() {
        let config = base_config();
        let (dataset, _) = run(
            &config,
            &[raw(&[
                ("User", "mmcbride"),
                ("Work Email", "m@example.com"),
                ("Cell", ""),
            ])],
        );
        let devices = dataset.sync_records(EntityKind::Device);
        assert_eq!(devices.len(), 1);
        assert_eq!(
            devices[0].get_str("targetName"),
            Some("mmcbride|Work Email")
        );
        assert_eq!(devices[0].get_str("deviceType"), Some("EMAIL"));
        assert_eq!(devices[0].get_str("emailAddress"), Some("m@example.com"));
        assert!(!devices[0].has("phoneNumber"));
    }

    #[test]
    fn test_fan_out_multiple_devices_distinct_names() {
        let config = base_config();
        let (dataset, _) = run(
            &config,
            &[raw(&[
                ("User", "mmcbride"),
                ("Work Email", "m@example.com"),
                ("Cell", "+13035551234"),
            ])],
        );
        let devices = dataset.sync_records(EntityKind::Device);
        assert_eq!(devices.len(), 2);
        assert_eq!(
            devices[0].get_str("targetName"),
            Some("mmcbride|Work Email")
        );
        assert_eq!(
            devices[1].get_str("targetName"),
            Some("mmcbride|Mobile Phone")
        );
        assert_eq!(
            devices[1].get_str("phoneNumber"),
            Some("+13035551234")
        );
        assert_eq!(devices[1].get_str("owner"), Some("mmcbride"));
    }

    #[test]
    fn test_missing_owner_skips_record() {
        let config = base_config();
        let (dataset, _) = run(
            &config,
            &[raw(&[("Work Email", "m@example.com")])],
        );
        assert!(dataset.sync_records(EntityKind::Device).is_empty());
    }

    #[test]
    fn test_sequence_densification() {
        let mut config = DevicesConfig {
            owner: Some(FieldSpec::from_input("User")),
            sequence_sync: true,
            ..DevicesConfig::default()
        };
        for (column, seq_column) in [
            ("Email A", "Seq A"),
            ("Email B", "Seq B"),
            ("Email C", "Seq C"),
            ("Email D", "Seq D"),
        ] {
            config.devices.push(DeviceSpec {
                input: column.to_string(),
                sequence: Some(FieldSpec::from_input(seq_column)),
                ..DeviceSpec::default()
            });
        }
        let (dataset, _) = run(
            &config,
            &[raw(&[
                ("User", "mmcbride"),
                ("Email A", "a@x.com"),
                ("Seq A", "5"),
                ("Email B", "b@x.com"),
                ("Seq B", "1"),
                ("Email C", "c@x.com"),
                ("Seq C", "1"),
                ("Email D", "d@x.com"),
                ("Seq D", "9"),
            ])],
        );
        let devices = dataset.sync_records(EntityKind::Device);
        // Input sequences [5, 1, 1, 9] densify to [1, 2, 3, 4]; the tied
        // 1s keep their original relative order.
        let order: Vec<(&str, i64)> = devices
            .iter()
            .map(|device| {
                (
                    device.get_str("emailAddress").unwrap(),
                    device.get("sequence").unwrap().as_int().unwrap(),
                )
            })
            .collect();
        assert_eq!(
            order,
            vec![
                ("b@x.com", 1),
                ("c@x.com", 2),
                ("a@x.com", 3),
                ("d@x.com", 4)
            ]
        );
    }

    #[test]
    fn test_optional_attribute_gating() {
        let mut config = base_config();
        config.devices[0].delay = Some(FieldSpec::from_input("Delay"));
        // delay_sync is off: the per-device spec alone is not enough.
        let (dataset, _) = run(
            &config,
            &[raw(&[
                ("User", "mmcbride"),
                ("Work Email", "m@example.com"),
                ("Delay", "5"),
            ])],
        );
        assert!(!dataset.sync_records(EntityKind::Device)[0].has("delay"));

        config.delay_sync = true;
        let (dataset, _) = run(
            &config,
            &[raw(&[
                ("User", "mmcbride"),
                ("Work Email", "m@example.com"),
                ("Delay", "5"),
            ])],
        );
        assert_eq!(
            dataset.sync_records(EntityKind::Device)[0].get_str("delay"),
            Some("5")
        );
    }

    #[test]
    fn test_validation_findings_do_not_filter() {
        let mut config = base_config();
        config.validate = true;
        let (dataset, findings) = run(
            &config,
            &[
                raw(&[("User", "A"), ("Work Email", "a@x.com")]),
                raw(&[("User", "B"), ("Work Email", "bad-email")]),
            ],
        );
        // Both records sync; one finding for B.
        assert_eq!(dataset.sync_records(EntityKind::Device).len(), 2);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, "emailAddress");
        assert_eq!(findings[0].identifier, "B|Work Email");
        assert_eq!(findings[0].value, "bad-email");
    }

    #[test]
    fn test_mirror_tags_synthesized_target_name() {
        let mut config = base_config();
        config.base.mirror_mode = MirrorMode::Strict;
        let (dataset, _) = run(
            &config,
            &[raw(&[("User", "mmcbride"), ("Work Email", "m@example.com")])],
        );
        let devices = dataset.sync_records(EntityKind::Device);
        assert_eq!(
            devices[0].external_key.as_deref(),
            Some("XMSYNC_mmcbride|Work Email")
        );
    }

    #[test]
    fn test_fields_reflect_configuration() {
        let mut config = base_config();
        config.sequence_sync = true;
        config.delay_sync = true;
        assert_eq!(
            fields(&config),
            vec![
                "targetName",
                "deviceType",
                "owner",
                "emailAddress",
                "phoneNumber",
                "sequence"
            ]
        );
        config.devices[1].delay = Some(FieldSpec::from_default("0"));
        assert!(fields(&config).contains(&"delay".to_string()));
    }
}
