//! Per-field value resolution from input / default / initial sources.
//!
//! Every entity processor resolves each target field through the same
//! precedence: a truthy input column wins, a falsy or absent input falls
//! back to the declared default, and a field with neither stays configured
//! but empty. Unconfigured fields are omitted entirely, which tells the
//! reconciliation engine not to touch that attribute on the remote system.

use crate::config::FieldSpec;
use crate::record::RawRecord;
use crate::value::FieldValue;

/// Resolve a field from an input record.
///
/// Returns `None` when the field is unconfigured. A configured field always
/// resolves to `Some`: the input value when truthy, otherwise the default,
/// otherwise [`FieldValue::Null`] (configured-but-empty).
///
/// Falsy input values (empty string, `false`, `0`, null) fall through to the
/// default; this matches the source system's resolution semantics exactly.
#[must_use]
pub fn resolve(spec: &FieldSpec, record: &RawRecord) -> Option<FieldValue> {
    if !spec.is_configured() {
        return None;
    }

    if let Some(column) = &spec.input {
        if let Some(value) = record.get(column) {
            if value.is_truthy() {
                return Some(value.clone());
            }
        }
    }

    Some(
        spec.default_value
            .clone()
            .unwrap_or(FieldValue::Null),
    )
}

/// Resolve a field's one-time creation-only value.
///
/// Returns the declared initial verbatim (including a declared `false`).
/// The result is written to the record's `initial` sub-map and is never
/// overwritten by input/default resolution.
#[must_use]
pub fn resolve_initial(spec: &FieldSpec) -> Option<FieldValue> {
    spec.initial.clone()
}
