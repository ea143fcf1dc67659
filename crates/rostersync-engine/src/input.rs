//! Input file readers.
//!
//! Each entity kind names one input file: a `.json` array of flat records or
//! a `.csv` with a header row and a configurable column delimiter. Any other
//! extension fails with an unsupported-format error. Reads are synchronous
//! single-shot; a failure fails the whole run.

use std::path::Path;

use tracing::debug;

use rostersync_core::config::CsvDelimiter;
use rostersync_core::error::{SyncError, SyncResult};
use rostersync_core::record::RawRecord;
use rostersync_core::value::FieldValue;

/// UTF-8 BOM bytes, stripped when a CSV export carries one.
const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Load the raw records of an input file.
///
/// The `delimiter` applies only to `.csv` input and defaults to comma.
pub fn load_records(path: &Path, delimiter: Option<CsvDelimiter>) -> SyncResult<Vec<RawRecord>> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    let records = match extension.as_deref() {
        Some("json") => parse_json(&std::fs::read_to_string(path)?)?,
        Some("csv") => parse_csv(&std::fs::read(path)?, delimiter.unwrap_or_default())?,
        _ => return Err(SyncError::unsupported_format(path.display().to_string())),
    };

    debug!(path = %path.display(), records = records.len(), "loaded input file");
    Ok(records)
}

/// Parse a JSON array of flat records.
fn parse_json(text: &str) -> SyncResult<Vec<RawRecord>> {
    let rows: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)?;
    Ok(rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(key, value)| (key, FieldValue::from(value)))
                .collect()
        })
        .collect())
}

/// Parse delimited text with a header row. Every cell arrives as a trimmed
/// string; resolution handles emptiness from there.
fn parse_csv(data: &[u8], delimiter: CsvDelimiter) -> SyncResult<Vec<RawRecord>> {
    let data = strip_utf8_bom(data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter.as_byte())
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let mut record = RawRecord::new();
        for (idx, header) in headers.iter().enumerate() {
            if header.is_empty() {
                continue;
            }
            let cell = row.get(idx).unwrap_or("").trim();
            record.insert(header.clone(), FieldValue::from(cell));
        }
        records.push(record);
    }
    Ok(records)
}

/// Strip a UTF-8 BOM from the beginning of the data if present.
fn strip_utf8_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(UTF8_BOM) {
        &data[UTF8_BOM.len()..]
    } else {
        data
    }
}
