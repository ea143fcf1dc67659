//! Delimited multi-value expansion for list fields.

use crate::value::FieldValue;

/// Default delimiter for multi-valued fields.
pub const DEFAULT_DELIMITER: &str = "|";

/// Expand a possibly-delimited value into an ordered list of strings.
///
/// Lists pass through unchanged (the delimiter is ignored). Strings split on
/// the delimiter with each element trimmed. An absent or null value stays
/// absent - never an empty list - so "not configured" and "configured empty"
/// remain distinguishable downstream.
///
/// Applied to person roles/supervisors, group supervisors/observers,
/// membership member-id lists, and custom person properties declaring a
/// delimiter.
#[must_use]
pub fn expand(value: Option<&FieldValue>, delimiter: Option<&str>) -> Option<Vec<String>> {
    let value = value?;
    match value {
        FieldValue::Null => None,
        FieldValue::List(items) => Some(items.clone()),
        other => {
            let delimiter = delimiter.unwrap_or(DEFAULT_DELIMITER);
            Some(
                other
                    .to_plain_string()
                    .split(delimiter)
                    .map(|part| part.trim().to_string())
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_and_trim() {
        let value = FieldValue::from("admin | supervisor|observer");
        assert_eq!(
            expand(Some(&value), None),
            Some(vec![
                "admin".to_string(),
                "supervisor".to_string(),
                "observer".to_string()
            ])
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let value = FieldValue::from("a;b; c");
        assert_eq!(
            expand(Some(&value), Some(";")),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_list_passes_through_ignoring_delimiter() {
        let value = FieldValue::List(vec!["x|y".to_string(), "z".to_string()]);
        assert_eq!(
            expand(Some(&value), Some("|")),
            Some(vec!["x|y".to_string(), "z".to_string()])
        );
    }

    #[test]
    fn test_absent_stays_absent() {
        assert_eq!(expand(None, None), None);
        assert_eq!(expand(Some(&FieldValue::Null), None), None);
    }

    #[test]
    fn test_single_value_yields_singleton() {
        let value = FieldValue::from("alone");
        assert_eq!(expand(Some(&value), None), Some(vec!["alone".to_string()]));
    }

    #[test]
    fn test_round_trip() {
        let values = vec!["one".to_string(), "two".to_string(), "three".to_string()];
        let joined = FieldValue::from(values.join("|"));
        assert_eq!(expand(Some(&joined), Some("|")), Some(values));
    }
}
