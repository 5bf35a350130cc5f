//! Metric-report classification and remediation.
//!
//! Reports are produced by an external scorer and are sometimes
//! double-serialized: a JSON string whose contents are themselves JSON.
//! Classification parses with exactly one level of string unwrap; deeper
//! nesting is not chased. Remediation (deleting an irrecoverably malformed
//! report) is a separate call so the destructive step stays visible and can
//! be skipped for dry runs.

use crate::util::truncate_string;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

const PREVIEW_BYTES: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReasonKind {
    FileEmpty,
    InvalidJson,
    NoScoreField,
    OtherError,
}

/// One diagnostic record attached to a failed report.
#[derive(Clone, Debug, Serialize)]
pub struct ReasonRecord {
    pub metric: String,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<String>>,
}

impl ReasonRecord {
    fn new(metric: &str, file: &Path) -> Self {
        ReasonRecord {
            metric: metric.to_string(),
            file: file.display().to_string(),
            error: None,
            content_preview: None,
            data_type: None,
            keys: None,
        }
    }
}

#[derive(Debug)]
pub enum ReportClass {
    Valid { score: f64 },
    Invalid { kind: ReasonKind, record: ReasonRecord },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemediationMode {
    Delete,
    DryRun,
}

/// Metric name for a report file: the file stem.
pub fn metric_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse raw report content, unwrapping exactly one level of string
/// serialization. A doubly-wrapped payload stays a string.
pub fn parse_with_unwrap(raw: &str) -> Result<Value, serde_json::Error> {
    let value: Value = serde_json::from_str(raw)?;
    if let Value::String(inner) = &value {
        return serde_json::from_str(inner);
    }
    Ok(value)
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Classify one report file. Read and parse problems land in a reason
/// category rather than aborting the scan. Never deletes.
pub fn classify_report(path: &Path) -> ReportClass {
    let metric = metric_name(path);
    let mut record = ReasonRecord::new(&metric, path);

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            record.error = Some(format!("read report: {err}"));
            return ReportClass::Invalid {
                kind: ReasonKind::OtherError,
                record,
            };
        }
    };

    if raw.trim().is_empty() {
        return ReportClass::Invalid {
            kind: ReasonKind::FileEmpty,
            record,
        };
    }

    let value = match parse_with_unwrap(&raw) {
        Ok(value) => value,
        Err(err) => {
            record.error = Some(err.to_string());
            record.content_preview = Some(truncate_string(&raw, PREVIEW_BYTES));
            return ReportClass::Invalid {
                kind: ReasonKind::InvalidJson,
                record,
            };
        }
    };

    match &value {
        Value::Object(map) if map.is_empty() => ReportClass::Invalid {
            kind: ReasonKind::FileEmpty,
            record,
        },
        Value::Array(items) if items.is_empty() => ReportClass::Invalid {
            kind: ReasonKind::FileEmpty,
            record,
        },
        Value::Object(map) => match map.get("score") {
            Some(score) => ReportClass::Valid {
                score: score.as_f64().unwrap_or(0.0),
            },
            None => {
                record.data_type = Some(value_type_name(&value).to_string());
                record.keys = Some(map.keys().cloned().collect());
                ReportClass::Invalid {
                    kind: ReasonKind::NoScoreField,
                    record,
                }
            }
        },
        other => {
            record.data_type = Some(value_type_name(other).to_string());
            ReportClass::Invalid {
                kind: ReasonKind::NoScoreField,
                record,
            }
        }
    }
}

/// Delete a report classified `invalid_json`. Returns a follow-up
/// `other_error` record when the deletion itself fails; never fatal.
pub fn remediate_invalid(
    path: &Path,
    class: &ReportClass,
    mode: RemediationMode,
) -> Option<ReasonRecord> {
    let ReportClass::Invalid {
        kind: ReasonKind::InvalidJson,
        ..
    } = class
    else {
        return None;
    };
    if mode == RemediationMode::DryRun {
        tracing::debug!(file = %path.display(), "dry run, keeping malformed report");
        return None;
    }
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::info!(file = %path.display(), "deleted malformed report");
            None
        }
        Err(err) => {
            let mut record = ReasonRecord::new(&metric_name(path), path);
            record.error = Some(format!("delete malformed report: {err}"));
            Some(record)
        }
    }
}

/// Re-read the score from a completed report. Non-numeric scores count as
/// 0.0 so the divisor stays the completed count.
pub fn read_report_score(path: &Path) -> Option<f64> {
    let raw = fs::read_to_string(path).ok()?;
    let value = parse_with_unwrap(&raw).ok()?;
    let score = value.as_object()?.get("score")?;
    Some(score.as_f64().unwrap_or(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_report(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).expect("write report");
        path
    }

    #[test]
    fn plain_report_with_score_is_valid() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_report(&dir, "style.json", r#"{"score": 8}"#);
        match classify_report(&path) {
            ReportClass::Valid { score } => assert_eq!(score, 8.0),
            other => panic!("expected valid, got {other:?}"),
        }
    }

    #[test]
    fn string_wrapped_report_is_valid_after_one_unwrap() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_report(&dir, "style.json", r#""{\"score\": 6}""#);
        match classify_report(&path) {
            ReportClass::Valid { score } => assert_eq!(score, 6.0),
            other => panic!("expected valid, got {other:?}"),
        }
        assert_eq!(read_report_score(&path), Some(6.0));
    }

    #[test]
    fn doubly_wrapped_report_is_not_unwrapped_further() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Two levels of wrapping: the single unwrap leaves a string value.
        let path = write_report(&dir, "deep.json", r#""\"{\\\"score\\\": 3}\"""#);
        match classify_report(&path) {
            ReportClass::Invalid { kind, record } => {
                assert_eq!(kind, ReasonKind::NoScoreField);
                assert_eq!(record.data_type.as_deref(), Some("string"));
            }
            other => panic!("expected no_score_field, got {other:?}"),
        }
    }

    #[test]
    fn zero_byte_and_blank_reports_are_file_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        for content in ["", "   \n", "{}", "[]"] {
            let path = write_report(&dir, "empty.json", content);
            match classify_report(&path) {
                ReportClass::Invalid { kind, .. } => assert_eq!(kind, ReasonKind::FileEmpty),
                other => panic!("expected file_empty for {content:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn mapping_without_score_reports_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_report(&dir, "odd.json", r#"{"rating": 5, "notes": "ok"}"#);
        match classify_report(&path) {
            ReportClass::Invalid { kind, record } => {
                assert_eq!(kind, ReasonKind::NoScoreField);
                assert_eq!(record.data_type.as_deref(), Some("object"));
                // serde_json maps iterate in sorted key order.
                assert_eq!(
                    record.keys,
                    Some(vec!["notes".to_string(), "rating".to_string()])
                );
            }
            other => panic!("expected no_score_field, got {other:?}"),
        }
    }

    #[test]
    fn remediate_deletes_only_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_report(&dir, "broken.json", "not json {");
        let class = classify_report(&path);
        assert!(matches!(
            class,
            ReportClass::Invalid {
                kind: ReasonKind::InvalidJson,
                ..
            }
        ));

        // Dry run leaves the file in place.
        assert!(remediate_invalid(&path, &class, RemediationMode::DryRun).is_none());
        assert!(path.exists());

        assert!(remediate_invalid(&path, &class, RemediationMode::Delete).is_none());
        assert!(!path.exists());

        // Non-invalid_json classes are never deleted.
        let empty = write_report(&dir, "empty.json", "");
        let class = classify_report(&empty);
        assert!(remediate_invalid(&empty, &class, RemediationMode::Delete).is_none());
        assert!(empty.exists());
    }

    #[test]
    fn read_score_handles_missing_and_non_numeric() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("absent.json");
        assert_eq!(read_report_score(&missing), None);

        let text_score = write_report(&dir, "text.json", r#"{"score": "high"}"#);
        assert_eq!(read_report_score(&text_score), Some(0.0));
    }
}
