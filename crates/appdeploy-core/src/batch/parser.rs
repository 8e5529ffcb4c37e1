//! JSON batch parser.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::BatchError;
use crate::types::{ChangeAction, ChangeRecord, RecordStatus};

const SUPERSEDED_BY_PREFIX: &str = "superseded by";

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "ApplicationName")]
    application_name: String,
    #[serde(rename = "Action")]
    action: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "Comment", default)]
    comment: Option<String>,
    #[serde(rename = "SupersededBy", default)]
    superseded_by: Option<String>,
}

/// Read and parse a batch file.
pub fn parse_batch_file(path: &Path) -> Result<Vec<ChangeRecord>, BatchError> {
    let content = std::fs::read_to_string(path).map_err(|source| BatchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_batch_str(&content)
}

/// Parse batch content. Accepts a bare array of records or an object
/// holding them under `Applications`.
pub fn parse_batch_str(content: &str) -> Result<Vec<ChangeRecord>, BatchError> {
    // Some exporters write a UTF-8 BOM.
    let content = content.trim_start_matches('\u{feff}');
    let document: Value =
        serde_json::from_str(content).map_err(|e| BatchError::Parse(e.to_string()))?;

    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("Applications") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(BatchError::Parse(
                    "'Applications' must be an array".to_string(),
                ));
            }
            None => {
                return Err(BatchError::Parse(
                    "expected an array of records or an 'Applications' array".to_string(),
                ));
            }
        },
        other => {
            return Err(BatchError::Parse(format!(
                "expected an array of records, found {}",
                json_kind(&other)
            )));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let raw: RawRecord = serde_json::from_value(item)
                .map_err(|e| BatchError::InvalidRecord {
                    index,
                    reason: e.to_string(),
                })?;
            to_record(index, raw)
        })
        .collect()
}

fn to_record(index: usize, raw: RawRecord) -> Result<ChangeRecord, BatchError> {
    let application_name = raw.application_name.trim().to_string();
    if application_name.is_empty() {
        return Err(BatchError::InvalidRecord {
            index,
            reason: "ApplicationName is empty".to_string(),
        });
    }

    let status = match raw.status.trim().to_ascii_lowercase().as_str() {
        "ok" => RecordStatus::Ok,
        "fail" | "failed" => RecordStatus::Fail,
        other => {
            return Err(BatchError::InvalidRecord {
                index,
                reason: format!("unknown Status '{other}' (expected OK or Fail)"),
            });
        }
    };

    let comment = raw
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    let superseded_by = raw
        .superseded_by
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| comment.as_deref().and_then(parse_superseded_by));

    Ok(ChangeRecord {
        application_name,
        action: ChangeAction::parse(&raw.action),
        status,
        superseded_by,
        comment,
    })
}

/// Extract `X` from a comment of the form `Superseded by X`.
pub fn parse_superseded_by(comment: &str) -> Option<String> {
    let comment = comment.trim();
    let prefix = comment.get(..SUPERSEDED_BY_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(SUPERSEDED_BY_PREFIX) {
        return None;
    }
    let rest = &comment[SUPERSEDED_BY_PREFIX.len()..];
    if !rest.is_empty() && !rest.starts_with(|c: char| c.is_whitespace() || c == ':') {
        return None;
    }
    let name = rest.trim();
    let name = name.strip_prefix(':').unwrap_or(name).trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_array_batch() {
        let json = r#"[
            {"ApplicationName": "Foo 1.0", "Action": "Supersede", "Status": "OK", "Comment": "Superseded by Foo 2.0"},
            {"ApplicationName": "Bar", "Action": "Create", "Status": "OK"},
            {"ApplicationName": "Baz", "Action": "Create", "Status": "Fail", "Comment": "Packaging failed"}
        ]"#;

        let records = parse_batch_str(json).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].action, ChangeAction::Supersede);
        assert_eq!(records[0].superseded_by.as_deref(), Some("Foo 2.0"));
        assert_eq!(records[1].superseded_by, None);
        assert_eq!(records[2].status, RecordStatus::Fail);
        assert_eq!(records[2].comment.as_deref(), Some("Packaging failed"));
    }

    #[test]
    fn test_parse_wrapped_batch() {
        let json = r#"{"Applications": [
            {"ApplicationName": "Bar", "Action": "Create", "Status": "ok"}
        ], "Generated": "2024-01-01"}"#;

        let records = parse_batch_str(json).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_ok());
    }

    #[test]
    fn test_explicit_superseded_by_wins_over_comment() {
        let json = r#"[{"ApplicationName": "Foo", "Action": "Supersede", "Status": "OK",
            "Comment": "Superseded by Old", "SupersededBy": "New"}]"#;

        let records = parse_batch_str(json).unwrap();
        assert_eq!(records[0].superseded_by.as_deref(), Some("New"));
    }

    #[test]
    fn test_comment_without_word_boundary_names_no_replacement() {
        let json = r#"[{"ApplicationName": "Foo", "Action": "Supersede", "Status": "OK",
            "Comment": "Superseded bypassed manually"}]"#;

        let records = parse_batch_str(json).unwrap();
        assert_eq!(records[0].superseded_by, None);
        assert_eq!(
            records[0].comment.as_deref(),
            Some("Superseded bypassed manually")
        );
    }

    #[test]
    fn test_unknown_action_is_other() {
        let json = r#"[{"ApplicationName": "Foo", "Action": "Retire", "Status": "OK"}]"#;
        let records = parse_batch_str(json).unwrap();
        assert_eq!(records[0].action, ChangeAction::Other("Retire".to_string()));
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let json = r#"[{"ApplicationName": "Foo", "Action": "Create", "Status": "Pending"}]"#;
        let err = parse_batch_str(json).unwrap_err();
        assert!(matches!(err, BatchError::InvalidRecord { index: 0, .. }));
        assert!(err.to_string().contains("Pending") || err.to_string().contains("pending"));
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"[{"ApplicationName": "Foo", "Status": "OK"}]"#;
        assert!(matches!(
            parse_batch_str(json),
            Err(BatchError::InvalidRecord { index: 0, .. })
        ));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(parse_batch_str("[{"), Err(BatchError::Parse(_))));
        assert!(matches!(parse_batch_str("42"), Err(BatchError::Parse(_))));
    }

    #[test]
    fn test_bom_is_ignored() {
        let json = "\u{feff}[]";
        assert!(parse_batch_str(json).unwrap().is_empty());
    }

    #[test]
    fn test_parse_superseded_by() {
        assert_eq!(parse_superseded_by("Superseded by Bar"), Some("Bar".to_string()));
        assert_eq!(
            parse_superseded_by("  superseded BY   Bar 2.0 "),
            Some("Bar 2.0".to_string())
        );
        assert_eq!(parse_superseded_by("Superseded by: Bar"), Some("Bar".to_string()));
        assert_eq!(parse_superseded_by("Superseded by"), None);
        assert_eq!(parse_superseded_by("Replaced by Bar"), None);
        assert_eq!(parse_superseded_by("short"), None);
        assert_eq!(parse_superseded_by("Superseded bypassed manually"), None);
        assert_eq!(parse_superseded_by("Superseded by:Bar"), Some("Bar".to_string()));
    }

    #[test]
    fn test_parse_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"[{{"ApplicationName": "Bar", "Action": "Create", "Status": "OK"}}]"#
        )
        .unwrap();

        let records = parse_batch_file(temp_file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].application_name, "Bar");
    }

    #[test]
    fn test_parse_nonexistent_file() {
        let result = parse_batch_file(Path::new("/nonexistent/batch.json"));
        assert!(matches!(result, Err(BatchError::Read { .. })));
    }
}
