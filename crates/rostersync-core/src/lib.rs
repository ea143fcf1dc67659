//! # rostersync core
//!
//! Value model, record types, configuration surface, and field resolution for
//! the rostersync transformation engine.
//!
//! rostersync turns tabular roster data (people, devices, groups, group
//! memberships, sites) into a normalized working dataset that an external
//! reconciliation engine applies to a remote notification directory. This
//! crate holds everything the engine crate builds on:
//!
//! - [`value`] - The [`FieldValue`](value::FieldValue) variant type carried by
//!   every record field
//! - [`record`] - Entity kinds, sync records, and the per-run working dataset
//! - [`config`] - The declarative configuration tree driving a run
//! - [`resolve`] - Per-field resolution from input / default / initial sources
//! - [`expand`] - Delimited multi-value expansion for list fields
//! - [`error`] - Error types shared across the workspace
//!
//! ## Example
//!
//! ```
//! use rostersync_core::prelude::*;
//! use std::collections::HashMap;
//!
//! let spec = FieldSpec::from_input("First Name").with_default("Unknown");
//! let mut raw: RawRecord = HashMap::new();
//! raw.insert("First Name".into(), FieldValue::from("Mary"));
//!
//! assert_eq!(resolve(&spec, &raw), Some(FieldValue::from("Mary")));
//! ```

pub mod config;
pub mod error;
pub mod expand;
pub mod record;
pub mod resolve;
pub mod value;

/// Prelude module for convenient imports.
///
/// ```
/// use rostersync_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{
        CsvDelimiter, DeviceSpec, DevicesConfig, EntityConfig, FieldSpec, MirrorMode,
        PersonConfig, PropertySpec, SyncConfig,
    };
    pub use crate::error::{SyncError, SyncResult};
    pub use crate::expand::{expand, DEFAULT_DELIMITER};
    pub use crate::record::{EntityKind, RawRecord, SyncRecord, WorkingDataset};
    pub use crate::resolve::{resolve, resolve_initial};
    pub use crate::value::FieldValue;
}
