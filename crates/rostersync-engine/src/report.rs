//! Advisory phone/email format validation and the report writer.
//!
//! Device records with malformed values still sync; the findings feed a
//! delimited report for operators to clean up the source system. Findings
//! accumulate in a run-owned vector, never in shared state, so independent
//! runs cannot bleed into each other's reports.

use std::path::Path;
use std::sync::LazyLock;

use serde::Serialize;
use tracing::warn;

use rostersync_core::error::SyncResult;
use rostersync_core::record::SyncRecord;
use rostersync_core::value::FieldValue;

/// Canonical international phone pattern: a leading `+`, a non-zero country
/// digit, then 6 to 14 further digits.
static PHONE_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"^\+?[1-9][0-9]{6,14}$").expect("PHONE_REGEX is a valid regex pattern")
});

/// Standard address pattern: one local part, one `@`, a dotted domain.
static EMAIL_REGEX: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~.-]+@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z]{2,}$",
    )
    .expect("EMAIL_REGEX is a valid regex pattern")
});

/// A single format violation: the offending field, the device it belongs
/// to, and the raw value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFinding {
    /// The violated field: `phoneNumber` or `emailAddress`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The device's target name.
    pub identifier: String,
    /// The raw value that failed validation.
    pub value: String,
}

/// Check a device record's phone/email values, appending a finding per
/// violation. Advisory only: the record is synced regardless.
pub fn check_device(record: &SyncRecord, findings: &mut Vec<ValidationFinding>) {
    let identifier = record
        .get("targetName")
        .map(FieldValue::to_plain_string)
        .unwrap_or_default();

    if let Some(value) = record.get("phoneNumber").filter(|v| v.is_truthy()) {
        let text = value.to_plain_string();
        if !PHONE_REGEX.is_match(&text) {
            warn!(device = %identifier, value = %text, "malformed phone number");
            findings.push(ValidationFinding {
                kind: "phoneNumber".to_string(),
                identifier: identifier.clone(),
                value: text,
            });
        }
    }

    if let Some(value) = record.get("emailAddress").filter(|v| v.is_truthy()) {
        let text = value.to_plain_string();
        if !EMAIL_REGEX.is_match(&text) {
            warn!(device = %identifier, value = %text, "malformed email address");
            findings.push(ValidationFinding {
                kind: "emailAddress".to_string(),
                identifier,
                value: text,
            });
        }
    }
}

/// Write the findings as a delimited report of `type,identifier,value` rows.
pub fn write_report(path: &Path, findings: &[ValidationFinding]) -> SyncResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["type", "identifier", "value"])?;
    for finding in findings {
        writer.write_record([&finding.kind, &finding.identifier, &finding.value])?;
    }
    writer.flush()?;
    Ok(())
}
