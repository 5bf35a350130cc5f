//! Expected-metrics and auxiliary-files manifest loading.
//!
//! Manifests are consumed, never produced, and arrive in the same
//! occasionally string-wrapped shape as the reports. Every read failure here
//! collapses to "no manifest data" so aggregation and recovery keep going.

use crate::report::parse_with_unwrap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

// Keys recognized as a metric identifier, in lookup order.
const METRIC_ID_KEYS: &[&str] = &["metric", "metric_name", "name", "id"];

fn metric_id(entry: &Value) -> Option<String> {
    let map = entry.as_object()?;
    for key in METRIC_ID_KEYS {
        if let Some(id) = map.get(*key).and_then(Value::as_str) {
            return Some(id.to_string());
        }
    }
    None
}

/// Load the set of expected metric names from a manifest: a single object or
/// an array of objects, possibly string-wrapped. Returns `None` when no
/// manifest is usable, which is distinct from an empty expectation.
pub fn load_expected_metrics(path: &Path) -> Option<BTreeSet<String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::debug!(file = %path.display(), error = %err, "no usable metrics manifest");
            return None;
        }
    };
    let value = match parse_with_unwrap(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(file = %path.display(), error = %err, "metrics manifest did not parse");
            return None;
        }
    };

    let entries: Vec<Value> = match value {
        Value::Array(items) => items,
        object @ Value::Object(_) => vec![object],
        _ => return None,
    };

    let expected: BTreeSet<String> = entries.iter().filter_map(metric_id).collect();
    if expected.is_empty() {
        return None;
    }
    Some(expected)
}

/// Extra relative paths to preserve for one project, from the global
/// auxiliary-files mapping. Missing or unreadable manifests mean no extras.
pub fn load_auxiliary_paths(manifest_path: &Path, project_id: &str) -> Vec<String> {
    let raw = match fs::read_to_string(manifest_path) {
        Ok(raw) => raw,
        Err(_) => return Vec::new(),
    };
    let value: Value = match parse_with_unwrap(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(file = %manifest_path.display(), error = %err, "auxiliary manifest did not parse");
            return Vec::new();
        }
    };
    value
        .get(project_id)
        .and_then(Value::as_array)
        .map(|paths| {
            paths
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
