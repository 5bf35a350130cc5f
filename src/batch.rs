//! Corpus-wide aggregation over all project subdirectories.
//!
//! The batch runner is deliberately total: a project that cannot be scored
//! becomes a sentinel entry, never an abort, and the consolidated document is
//! written even when every validation fails.

use crate::aggregate::{aggregate_project, ProjectResult, ReasonBuckets};
use crate::cli::AggregateArgs;
use crate::report::RemediationMode;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Consolidated document file name, written at the corpus root.
pub const CORPUS_RESULT_NAME: &str = "aggregate_report.json";

/// Sentinel recorded for a project with no completed metric.
pub const NO_DATA_SENTINEL: &str = "no data";

/// Sentinel recorded for a project without a usable expected-metrics manifest.
pub const NO_MANIFEST_SENTINEL: &str = "no manifest";

const REPORTS_DIR_NAME: &str = "reports";
const METRICS_MANIFEST_NAME: &str = "expected_metrics.json";

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ScoreEntry {
    Score(f64),
    Sentinel(&'static str),
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MissingEntry {
    Metrics(Vec<String>),
    Sentinel(&'static str),
}

/// One batch pass over the corpus, keyed by project id throughout.
#[derive(Debug, Default, Serialize)]
pub struct CorpusResult {
    pub scores: BTreeMap<String, ScoreEntry>,
    pub valid_count: usize,
    pub average_score: f64,
    pub missing_metrics: BTreeMap<String, MissingEntry>,
    pub error_reasons: BTreeMap<String, ReasonBuckets>,
}

fn project_dirs(base: &Path) -> Result<Vec<(String, std::path::PathBuf)>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(base).with_context(|| format!("read corpus {}", base.display()))? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if !path.is_dir() || name.starts_with('.') {
            continue;
        }
        dirs.push((name, path));
    }
    dirs.sort();
    Ok(dirs)
}

fn record_project(corpus: &mut CorpusResult, id: &str, result: ProjectResult) {
    let score_entry = match result.final_score {
        Some(score) => ScoreEntry::Score(score),
        None => ScoreEntry::Sentinel(NO_DATA_SENTINEL),
    };
    corpus.scores.insert(id.to_string(), score_entry);
    let missing_entry = match result.missing_metrics {
        Some(missing) => MissingEntry::Metrics(missing.into_iter().collect()),
        None => MissingEntry::Sentinel(NO_MANIFEST_SENTINEL),
    };
    corpus.missing_metrics.insert(id.to_string(), missing_entry);
    corpus.error_reasons.insert(id.to_string(), result.reasons);
}

/// Aggregate every project under `base` into one [`CorpusResult`].
pub fn run_corpus(base: &Path, mode: RemediationMode) -> Result<CorpusResult> {
    let mut corpus = CorpusResult::default();
    let mut sum = 0.0;
    for (id, project_dir) in project_dirs(base)? {
        let result = aggregate_project(
            &project_dir.join(REPORTS_DIR_NAME),
            &project_dir.join(METRICS_MANIFEST_NAME),
            mode,
        );
        match result.final_score {
            Some(score) => {
                println!("scored {id}: {score:.2}");
                sum += score;
                corpus.valid_count += 1;
            }
            None => println!("scored {id}: {NO_DATA_SENTINEL}"),
        }
        record_project(&mut corpus, &id, result);
    }
    // Zero valid projects averages to 0.0 rather than propagating a null.
    corpus.average_score = if corpus.valid_count > 0 {
        sum / corpus.valid_count as f64
    } else {
        0.0
    };
    Ok(corpus)
}

fn print_summary(corpus: &CorpusResult) {
    println!();
    println!("valid projects: {}", corpus.valid_count);
    println!("average score: {:.2}", corpus.average_score);
    for (id, entry) in &corpus.missing_metrics {
        if let MissingEntry::Metrics(missing) = entry {
            if !missing.is_empty() {
                println!("  {id} missing: {}", missing.join(", "));
            }
        }
    }
    for (id, buckets) in &corpus.error_reasons {
        if buckets.is_empty() {
            continue;
        }
        let counts: Vec<String> = buckets
            .counts()
            .iter()
            .filter(|(_, count)| *count > 0)
            .map(|(label, count)| format!("{label}={count}"))
            .collect();
        println!("  {id} reasons: {}", counts.join(" "));
    }
}

/// Entry point for `caudit aggregate`.
pub fn run_aggregate(args: AggregateArgs) -> Result<()> {
    let mode = if args.keep_invalid {
        RemediationMode::DryRun
    } else {
        RemediationMode::Delete
    };
    let corpus = run_corpus(&args.corpus, mode)?;

    let out_path = args.corpus.join(CORPUS_RESULT_NAME);
    let body = serde_json::to_string_pretty(&corpus).context("serialize corpus result")?;
    fs::write(&out_path, body).with_context(|| format!("write {}", out_path.display()))?;

    print_summary(&corpus);
    println!("wrote {}", out_path.display());
    Ok(())
}
