//! Cardinality guard rails.
//!
//! A malformed or truncated input file must never mass-delete or mass-create
//! remote records. Each kind's counts are checked after its sequences are
//! built and before anything is handed to the reconciliation engine; a
//! violation aborts the whole run.

use tracing::debug;

use rostersync_core::config::EntityConfig;
use rostersync_core::error::{SyncError, SyncResult};
use rostersync_core::record::EntityKind;

/// Check a kind's guard rails.
///
/// Under mirror mode the sync count is bounded by `minimum`/`maximum`; an
/// undersized file would otherwise delete everything the mirror owns, an
/// oversized one would flood it. Outside mirror mode the only runaway risk
/// is explicit deletion rows, bounded by `maxDelete`. The deletion count is
/// the number of records actually routed to the removal sequence for the
/// kind in this run.
pub fn check_guard_rails(
    kind: EntityKind,
    config: &EntityConfig,
    sync_count: usize,
    delete_count: usize,
) -> SyncResult<()> {
    debug!(
        kind = %kind,
        sync_count,
        delete_count,
        mirror = %config.mirror_mode,
        "checking guard rails"
    );

    if config.mirror_mode.is_enabled() {
        if let Some(minimum) = config.minimum {
            if sync_count < minimum {
                return Err(SyncError::guard_rail(
                    kind.as_str(),
                    format!("{sync_count} records to sync is below the configured minimum of {minimum}"),
                ));
            }
        }
        if let Some(maximum) = config.maximum {
            if sync_count > maximum {
                return Err(SyncError::guard_rail(
                    kind.as_str(),
                    format!("{sync_count} records to sync exceeds the configured maximum of {maximum}"),
                ));
            }
        }
    } else if let Some(max_delete) = config.max_delete {
        if delete_count > max_delete {
            return Err(SyncError::guard_rail(
                kind.as_str(),
                format!("{delete_count} records to delete exceeds the configured maxDelete of {max_delete}"),
            ));
        }
    }

    Ok(())
}
