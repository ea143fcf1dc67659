//! # rostersync engine
//!
//! Configuration-driven transformation of roster input files into a
//! normalized working dataset for an external reconciliation engine.
//!
//! A run reads one input file per enabled entity kind, resolves each target
//! field from its configured source (input column, static default, one-time
//! initial value), expands delimited multi-value fields, tags or routes
//! records according to the mirror mode and deletion triggers, enforces
//! cardinality guard rails, and hands the result to an injected
//! [`Reconciler`](plan::Reconciler) exactly once.
//!
//! ## Crate Organization
//!
//! - [`input`] - `.json` / `.csv` readers producing raw records
//! - [`processor`] - The five entity processors (person, device, group,
//!   group membership, site)
//! - [`mirror`] - Destination-side record filtering per mirror mode
//! - [`guard`] - Cardinality guard rails checked before hand-off
//! - [`report`] - Advisory phone/email format validation and report writer
//! - [`hooks`] - Injected per-kind record transform hooks
//! - [`plan`] - Run options, plan, and the consumed reconciler interface
//! - [`runner`] - Run orchestration
//!
//! ## Example
//!
//! ```ignore
//! use rostersync_engine::prelude::*;
//!
//! let config = SyncConfig::from_path("sync.json")?;
//! let runner = SyncRunner::new(config);
//! let report = runner.run(&mut engine)?;
//! println!("synced {} people", report.outcome[&EntityKind::Person].synced.len());
//! ```

pub mod guard;
pub mod hooks;
pub mod input;
pub mod mirror;
pub mod plan;
pub mod processor;
pub mod report;
pub mod runner;

/// Prelude module for convenient imports.
///
/// ```
/// use rostersync_engine::prelude::*;
/// ```
pub mod prelude {
    pub use crate::guard::check_guard_rails;
    pub use crate::hooks::{Hooks, TransformHook};
    pub use crate::input::load_records;
    pub use crate::mirror::{OwnershipFilter, RecordFilter};
    pub use crate::plan::{EngineOutcome, KindOutcome, Reconciler, RunOptions, RunPlan, RunReport, SyncFailure};
    pub use crate::report::{write_report, ValidationFinding};
    pub use crate::runner::SyncRunner;
    pub use rostersync_core::prelude::*;
}
