//! Run orchestration.
//!
//! A run loads an immutable configuration snapshot, fails fast on
//! configuration conflicts, executes the entity processors sequentially
//! (person, device, group, group membership, site - memberships depend on
//! the group results already being present), guard-rails each kind, and
//! hands the dataset to the reconciliation engine exactly once. No state
//! outlives the run.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use rostersync_core::config::{EntityConfig, MirrorMode, SyncConfig};
use rostersync_core::error::SyncResult;
use rostersync_core::record::{EntityKind, RawRecord, WorkingDataset};

use crate::guard::check_guard_rails;
use crate::hooks::Hooks;
use crate::input::load_records;
use crate::mirror::{GroupScopeFilter, OwnershipFilter, RecordFilter};
use crate::plan::{Reconciler, RunOptions, RunPlan, RunReport};
use crate::processor::{device, group, membership, person, site, ProcessorContext};
use crate::report::write_report;

/// Builds and executes sync runs from one configuration snapshot.
pub struct SyncRunner {
    config: SyncConfig,
    hooks: Hooks,
    destination: WorkingDataset,
}

impl SyncRunner {
    /// Create a runner over a configuration snapshot.
    #[must_use]
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            hooks: Hooks::new(),
            destination: WorkingDataset::new(),
        }
    }

    /// Inject per-kind record transform hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Supply a destination-side snapshot for the transform hooks.
    #[must_use]
    pub fn with_destination_snapshot(mut self, destination: WorkingDataset) -> Self {
        self.destination = destination;
        self
    }

    /// Build the working dataset and per-kind engine options.
    ///
    /// Configuration conflicts abort before any record is read; a guard-rail
    /// violation aborts after dataset construction, before anything is
    /// handed to the engine.
    pub fn build(&self) -> SyncResult<RunPlan> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run_id = %run_id, "building working dataset");

        let mut dataset = WorkingDataset::new();
        let mut findings = Vec::new();
        let mut options: HashMap<EntityKind, RunOptions> = HashMap::new();
        let ctx = ProcessorContext {
            mirror_tag: &self.config.mirror_tag,
            hooks: &self.hooks,
            destination: &self.destination,
        };

        if self.config.users.base.sync {
            let records = self.read_input(&self.config.users.base)?;
            person::process(&self.config.users, &records, &ctx, &mut dataset)?;
            self.finish_kind(
                EntityKind::Person,
                &self.config.users.base,
                person::fields(&self.config.users),
                person::embed(&self.config.users),
                &dataset,
                &mut options,
            )?;
        }

        if self.config.devices.base.sync {
            let records = self.read_input(&self.config.devices.base)?;
            device::process(
                &self.config.devices,
                &records,
                &ctx,
                &mut dataset,
                &mut findings,
            )?;
            self.finish_kind(
                EntityKind::Device,
                &self.config.devices.base,
                device::fields(&self.config.devices),
                None,
                &dataset,
                &mut options,
            )?;
        }

        if self.config.groups.sync {
            let records = self.read_input(&self.config.groups)?;
            group::process(&self.config.groups, &records, &ctx, &mut dataset)?;
            self.finish_kind(
                EntityKind::Group,
                &self.config.groups,
                group::fields(&self.config.groups),
                group::embed(&self.config.groups),
                &dataset,
                &mut options,
            )?;
        }

        if self.config.group_members.sync {
            let records = self.read_input(&self.config.group_members)?;
            membership::process(&self.config.group_members, &records, &ctx, &mut dataset)?;
            let config = &self.config.group_members;
            check_guard_rails(
                EntityKind::GroupMembership,
                config,
                dataset.sync_records(EntityKind::GroupMembership).len(),
                dataset.remove_records(EntityKind::GroupMembership).len(),
            )?;
            // Memberships carry no ownership tag; mirror filtering scopes
            // them to the groups synced this run.
            let filter = config.mirror_mode.is_enabled().then(|| {
                RecordFilter::GroupScope(GroupScopeFilter::new(
                    dataset.natural_keys(EntityKind::Group),
                ))
            });
            options.insert(
                EntityKind::GroupMembership,
                RunOptions {
                    fields: membership::fields(config),
                    mirror: config.mirror_mode,
                    embed: None,
                    filter,
                },
            );
        }

        if self.config.sites.sync {
            let records = self.read_input(&self.config.sites)?;
            site::process(&self.config.sites, &records, &ctx, &mut dataset)?;
            self.finish_kind(
                EntityKind::Site,
                &self.config.sites,
                site::fields(&self.config.sites),
                None,
                &dataset,
                &mut options,
            )?;
        } else if self.config.users.create_sites && dataset.has_kind(EntityKind::Site) {
            // Sites created from person records sync with just their name.
            options.insert(
                EntityKind::Site,
                RunOptions {
                    fields: vec!["name".to_string()],
                    mirror: MirrorMode::Off,
                    embed: None,
                    filter: None,
                },
            );
        }

        Ok(RunPlan {
            run_id,
            started_at,
            dataset,
            options,
            findings,
        })
    }

    /// Build the dataset, hand it to the reconciliation engine once, and
    /// write the validation report when findings exist.
    pub fn run(&self, engine: &mut dyn Reconciler) -> SyncResult<RunReport> {
        let RunPlan {
            run_id,
            started_at,
            mut dataset,
            mut options,
            findings,
        } = self.build()?;

        let outcome = engine.reconcile(&mut dataset, &mut options)?;
        let completed_at = Utc::now();

        for (kind, result) in &outcome {
            info!(
                run_id = %run_id,
                kind = %kind,
                created = result.created.len(),
                updated = result.updated.len(),
                removed = result.removed.len(),
                errors = result.errors.len(),
                "reconciled"
            );
        }

        if !findings.is_empty() {
            warn!(count = findings.len(), "device records failed format validation");
            if let Some(path) = &self.config.report_path {
                write_report(path, &findings)?;
                info!(path = %path.display(), "wrote validation report");
            }
        }

        Ok(RunReport {
            run_id,
            started_at,
            completed_at,
            outcome,
            findings,
        })
    }

    /// Load a kind's input file.
    fn read_input(&self, config: &EntityConfig) -> SyncResult<Vec<RawRecord>> {
        let path = config.input_path.as_ref().ok_or_else(|| {
            rostersync_core::error::SyncError::configuration("missing input path")
        })?;
        load_records(path, config.file_delimiter)
    }

    /// Guard-rail a finished kind and record its engine options.
    fn finish_kind(
        &self,
        kind: EntityKind,
        config: &EntityConfig,
        fields: Vec<String>,
        embed: Option<String>,
        dataset: &WorkingDataset,
        options: &mut HashMap<EntityKind, RunOptions>,
    ) -> SyncResult<()> {
        check_guard_rails(
            kind,
            config,
            dataset.sync_records(kind).len(),
            dataset.remove_records(kind).len(),
        )?;

        let filter = config.mirror_mode.is_enabled().then(|| {
            RecordFilter::Ownership(OwnershipFilter::new(
                kind,
                config.mirror_mode,
                &self.config.mirror_tag,
                dataset.natural_keys(kind),
            ))
        });

        options.insert(
            kind,
            RunOptions {
                fields,
                mirror: config.mirror_mode,
                embed,
                filter,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{EngineOutcome, KindOutcome};
    use rostersync_core::error::SyncError;

    /// A reconciler that records what it was handed and syncs everything.
    #[derive(Default)]
    struct StubEngine {
        calls: usize,
        kinds: Vec<EntityKind>,
    }

    impl Reconciler for StubEngine {
        fn reconcile(
            &mut self,
            dataset: &mut WorkingDataset,
            options: &mut HashMap<EntityKind, RunOptions>,
        ) -> SyncResult<EngineOutcome> {
            self.calls += 1;
            let mut outcome = EngineOutcome::new();
            for (kind, _opts) in options.iter() {
                self.kinds.push(*kind);
                outcome.insert(
                    *kind,
                    KindOutcome {
                        synced: dataset.sync_records(*kind).to_vec(),
                        removed: dataset.remove_records(*kind).to_vec(),
                        ..KindOutcome::default()
                    },
                );
            }
            Ok(outcome)
        }
    }

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_empty_config_builds_empty_plan() {
        let runner = SyncRunner::new(SyncConfig::default());
        let plan = runner.build().unwrap();
        assert!(plan.options.is_empty());
        assert!(!plan.dataset.has_kind(EntityKind::Person));
        assert!(plan.findings.is_empty());
    }

    #[test]
    fn test_conflict_fails_before_reading() {
        let config = SyncConfig::from_json(
            r#"{
                "users": {"sync": true, "inputPath": "does-not-exist.json", "createSites": true},
                "sites": {"sync": true, "inputPath": "does-not-exist.json"}
            }"#,
        )
        .unwrap();
        // The input files do not exist; the conflict must win regardless.
        let err = SyncRunner::new(config).build().unwrap_err();
        assert!(matches!(err, SyncError::ConfigurationConflict { .. }));
    }

    #[test]
    fn test_guard_rail_aborts_before_engine() {
        let input = write_temp(
            "rostersync_guard_test.json",
            r#"[{"Group": "A"}, {"Group": "B"}]"#,
        );
        let config = SyncConfig::from_json(&format!(
            r#"{{"groups": {{
                "sync": true,
                "inputPath": {:?},
                "mirrorMode": true,
                "minimum": 10,
                "fields": {{"targetName": {{"input": "Group"}}}}
            }}}}"#,
            input
        ))
        .unwrap();

        let runner = SyncRunner::new(config);
        let mut engine = StubEngine::default();
        let err = runner.run(&mut engine).unwrap_err();
        assert!(err.is_guard_rail());
        assert_eq!(engine.calls, 0);
        std::fs::remove_file(&input).ok();
    }

    #[test]
    fn test_run_hands_dataset_once() {
        let input = write_temp(
            "rostersync_runner_test.json",
            r#"[{"Group": "Primary"}, {"Group": "Backup"}]"#,
        );
        let config = SyncConfig::from_json(&format!(
            r#"{{"groups": {{
                "sync": true,
                "inputPath": {:?},
                "fields": {{"targetName": {{"input": "Group"}}}}
            }}}}"#,
            input
        ))
        .unwrap();

        let runner = SyncRunner::new(config);
        let mut engine = StubEngine::default();
        let report = runner.run(&mut engine).unwrap();
        assert_eq!(engine.calls, 1);
        assert_eq!(engine.kinds, vec![EntityKind::Group]);
        assert_eq!(report.outcome[&EntityKind::Group].synced.len(), 2);
        std::fs::remove_file(&input).ok();
    }

    #[test]
    fn test_mirror_options_carry_filter() {
        let input = write_temp(
            "rostersync_filter_test.json",
            r#"[{"Group": "Primary"}]"#,
        );
        let config = SyncConfig::from_json(&format!(
            r#"{{"groups": {{
                "sync": true,
                "inputPath": {:?},
                "mirrorMode": "greedy",
                "fields": {{"targetName": {{"input": "Group"}}}}
            }}}}"#,
            input
        ))
        .unwrap();

        let plan = SyncRunner::new(config).build().unwrap();
        let opts = &plan.options[&EntityKind::Group];
        assert_eq!(opts.mirror, MirrorMode::Greedy);
        assert!(matches!(&opts.filter, Some(RecordFilter::Ownership(_))));
        assert!(opts.fields.contains(&"externalKey".to_string()));
        std::fs::remove_file(&input).ok();
    }

    #[test]
    fn test_membership_filter_scoped_to_groups() {
        let groups = write_temp(
            "rostersync_groups_input.json",
            r#"[{"Group": "Primary"}]"#,
        );
        let members = write_temp(
            "rostersync_members_input.json",
            r#"[
                {"Group": "Primary", "Members": "mmcbride|akaur"},
                {"Group": "Retired", "Members": "tslate"}
            ]"#,
        );
        let config = SyncConfig::from_json(&format!(
            r#"{{
                "groups": {{
                    "sync": true,
                    "inputPath": {:?},
                    "mirrorMode": true,
                    "fields": {{"targetName": {{"input": "Group"}}}}
                }},
                "groupMembers": {{
                    "sync": true,
                    "inputPath": {:?},
                    "mirrorMode": true,
                    "fields": {{
                        "group": {{"input": "Group"}},
                        "members": {{"input": "Members"}}
                    }}
                }}
            }}"#,
            groups, members
        ))
        .unwrap();

        let plan = SyncRunner::new(config).build().unwrap();
        let mut filter = match &plan.options[&EntityKind::GroupMembership].filter {
            Some(filter) => filter.clone(),
            None => panic!("expected a membership filter"),
        };
        let records = plan.dataset.sync_records(EntityKind::GroupMembership);
        assert_eq!(records.len(), 3);
        let retained: Vec<bool> = records
            .iter()
            .map(|record| filter.retain(&mut record.clone()))
            .collect();
        // Memberships of the unsynced "Retired" group are dropped.
        assert_eq!(retained, vec![true, true, false]);
        std::fs::remove_file(&groups).ok();
        std::fs::remove_file(&members).ok();
    }
}
