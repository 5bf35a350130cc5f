//! Per-project metric aggregation.
//!
//! One project's reports directory is folded into a final score plus four
//! categorized failure buckets, then diffed against the expected-metrics
//! manifest when one is usable. The aggregator is read-only except for the
//! malformed-report remediation it delegates to [`crate::report`].

use crate::manifest::load_expected_metrics;
use crate::report::{
    classify_report, metric_name, read_report_score, remediate_invalid, ReasonKind, ReasonRecord,
    RemediationMode, ReportClass,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Failure records grouped by category, serialized with the four fixed
/// category names.
#[derive(Debug, Default, Serialize)]
pub struct ReasonBuckets {
    pub file_empty: Vec<ReasonRecord>,
    pub invalid_json: Vec<ReasonRecord>,
    pub no_score_field: Vec<ReasonRecord>,
    pub other_error: Vec<ReasonRecord>,
}

impl ReasonBuckets {
    fn push(&mut self, kind: ReasonKind, record: ReasonRecord) {
        match kind {
            ReasonKind::FileEmpty => self.file_empty.push(record),
            ReasonKind::InvalidJson => self.invalid_json.push(record),
            ReasonKind::NoScoreField => self.no_score_field.push(record),
            ReasonKind::OtherError => self.other_error.push(record),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_empty.is_empty()
            && self.invalid_json.is_empty()
            && self.no_score_field.is_empty()
            && self.other_error.is_empty()
    }

    pub fn counts(&self) -> [(&'static str, usize); 4] {
        [
            ("file_empty", self.file_empty.len()),
            ("invalid_json", self.invalid_json.len()),
            ("no_score_field", self.no_score_field.len()),
            ("other_error", self.other_error.len()),
        ]
    }
}

/// Aggregation outcome for one project. `final_score` is `None` when no
/// metric completed, which is distinct from a score of zero.
#[derive(Debug, Default)]
pub struct ProjectResult {
    pub final_score: Option<f64>,
    pub missing_metrics: Option<BTreeSet<String>>,
    pub completed: BTreeSet<String>,
    pub reasons: ReasonBuckets,
}

fn report_files(reports_dir: &Path, reasons: &mut ReasonBuckets) -> Vec<PathBuf> {
    let entries = match fs::read_dir(reports_dir) {
        Ok(entries) => entries,
        Err(err) => {
            reasons.push(
                ReasonKind::OtherError,
                ReasonRecord {
                    metric: String::new(),
                    file: reports_dir.display().to_string(),
                    error: Some(format!("read reports directory: {err}")),
                    content_preview: None,
                    data_type: None,
                    keys: None,
                },
            );
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();
    files
}

/// Aggregate one project's reports directory. A missing directory is an
/// empty result, not an error.
pub fn aggregate_project(
    reports_dir: &Path,
    manifest_path: &Path,
    mode: RemediationMode,
) -> ProjectResult {
    let mut result = ProjectResult::default();
    if !reports_dir.is_dir() {
        return result;
    }

    let mut completed_paths: Vec<PathBuf> = Vec::new();
    for path in report_files(reports_dir, &mut result.reasons) {
        match classify_report(&path) {
            ReportClass::Valid { .. } => {
                result.completed.insert(metric_name(&path));
                completed_paths.push(path);
            }
            class @ ReportClass::Invalid { .. } => {
                if let Some(follow_up) = remediate_invalid(&path, &class, mode) {
                    result.reasons.push(ReasonKind::OtherError, follow_up);
                }
                if let ReportClass::Invalid { kind, record } = class {
                    result.reasons.push(kind, record);
                }
            }
        }
    }

    if result.completed.is_empty() {
        return result;
    }

    // Scores are re-read independently of classification; the upstream scale
    // is double the published one, hence the final halving.
    let sum: f64 = completed_paths
        .iter()
        .filter_map(|path| read_report_score(path))
        .sum();
    result.final_score = Some(sum / result.completed.len() as f64 / 2.0);

    result.missing_metrics = load_expected_metrics(manifest_path)
        .map(|expected| expected.difference(&result.completed).cloned().collect());

    result
}
