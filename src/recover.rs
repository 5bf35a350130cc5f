//! Workspace recovery after failed generation attempts.
//!
//! Two strategies, chosen by whether a template root is configured:
//!
//! - **Template restore**: wipe the project tree and copy the clean template
//!   project back in, discarding all prior generated content.
//! - **Selective preserve/restore**: stage the specification file, the
//!   evaluation directory, and any declared auxiliary paths into an isolated
//!   temp area, destroy the project tree, then restore the staged entries.
//!
//! The original tree is destroyed only after staging fully succeeds, so a
//! crash mid-stage leaves at most an orphaned temp directory, never a
//! corrupted project. The temp area is released on every exit path via
//! [`tempfile::TempDir`]'s drop.

use crate::cli::RecoverArgs;
use crate::detect::{needs_recovery, DetectorPolicy};
use crate::manifest::load_auxiliary_paths;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Component, Path};

// Specification file names recognized in a workspace, in lookup order.
pub const SPEC_FILE_NAMES: &[&str] = &["spec.md", "specification.md"];

pub const EVALUATION_DIR_NAME: &str = "evaluation";

// Lives one directory level above the workspace base path.
pub const AUX_MANIFEST_NAME: &str = "auxiliary_files.json";

/// Explicit set of project ids a recovery pass visits.
#[derive(Debug)]
pub struct RecoveryPlan {
    pub ids: Vec<u32>,
}

impl RecoveryPlan {
    pub fn from_args(args: &RecoverArgs) -> Result<Self> {
        if let Some(ids) = &args.ids {
            if ids.is_empty() {
                return Err(anyhow!("--ids must name at least one project"));
            }
            return Ok(RecoveryPlan { ids: ids.clone() });
        }
        match (args.from, args.to) {
            (Some(from), Some(to)) if from <= to => Ok(RecoveryPlan {
                ids: (from..=to).collect(),
            }),
            (Some(_), Some(_)) => Err(anyhow!("--from must not exceed --to")),
            _ => Err(anyhow!("provide --ids or both --from and --to")),
        }
    }
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("read {}", src.display()))? {
        let entry = entry?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        if path.is_dir() {
            copy_dir_recursive(&path, &target)?;
        } else if path.is_file() {
            fs::copy(&path, &target).with_context(|| format!("copy {}", path.display()))?;
        }
    }
    Ok(())
}

fn copy_file_with_parents(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    fs::copy(source, target).with_context(|| format!("copy {}", source.display()))?;
    Ok(())
}

/// Full reset from the template corpus. Returns `false` (a no-op) when the
/// template project is absent or not a directory.
pub fn restore_from_template(
    project_dir: &Path,
    template_root: &Path,
    project_id: &str,
) -> Result<bool> {
    let template = template_root.join(project_id);
    if !template.is_dir() {
        tracing::warn!(template = %template.display(), "template project absent, skipping restore");
        return Ok(false);
    }
    if project_dir.exists() {
        // Top-level removal failure aborts this project's recovery.
        fs::remove_dir_all(project_dir)
            .with_context(|| format!("remove {}", project_dir.display()))?;
    }
    copy_dir_recursive(&template, project_dir)?;
    Ok(true)
}

fn is_safe_relative(rel: &str) -> bool {
    Path::new(rel)
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn preserve_list(project_dir: &Path, aux_paths: &[String]) -> Vec<String> {
    let mut keep = Vec::new();
    for name in SPEC_FILE_NAMES {
        if project_dir.join(name).is_file() {
            keep.push(name.to_string());
            break;
        }
    }
    if project_dir.join(EVALUATION_DIR_NAME).is_dir() {
        keep.push(EVALUATION_DIR_NAME.to_string());
    }
    for rel in aux_paths {
        // Auxiliary paths come from a manifest; never follow one outside
        // the project tree.
        if !is_safe_relative(rel) {
            tracing::warn!(path = %rel, "auxiliary path escapes the project tree, ignoring");
            continue;
        }
        if project_dir.join(rel).exists() && !keep.contains(rel) {
            keep.push(rel.clone());
        }
    }
    keep
}

struct StagedEntry {
    rel: String,
    is_dir: bool,
}

/// Preserve spec/evaluation/auxiliary assets, wipe the project tree, and
/// restore the staged entries into a fresh directory. Per-entry failures are
/// logged and skipped; only the top-level wipe propagates.
pub fn selective_preserve_restore(project_dir: &Path, aux_paths: &[String]) -> Result<()> {
    let staging = tempfile::tempdir().context("create staging dir")?;
    let mut staged: Vec<StagedEntry> = Vec::new();
    for rel in preserve_list(project_dir, aux_paths) {
        let source = project_dir.join(&rel);
        let target = staging.path().join(&rel);
        let is_dir = source.is_dir();
        let outcome = if is_dir {
            copy_dir_recursive(&source, &target)
        } else {
            copy_file_with_parents(&source, &target)
        };
        match outcome {
            Ok(()) => staged.push(StagedEntry { rel, is_dir }),
            Err(err) => {
                tracing::warn!(path = %source.display(), error = %err, "failed to stage entry, skipping");
            }
        }
    }

    if project_dir.exists() {
        fs::remove_dir_all(project_dir)
            .with_context(|| format!("remove {}", project_dir.display()))?;
    }
    fs::create_dir_all(project_dir)
        .with_context(|| format!("recreate {}", project_dir.display()))?;

    for entry in &staged {
        let source = staging.path().join(&entry.rel);
        let dest = project_dir.join(&entry.rel);
        let outcome = if entry.is_dir {
            if dest.exists() {
                // Idempotency guard: an already-restored directory stays.
                Ok(())
            } else {
                copy_dir_recursive(&source, &dest)
            }
        } else {
            copy_file_with_parents(&source, &dest)
        };
        if let Err(err) = outcome {
            tracing::warn!(path = %dest.display(), error = %err, "failed to restore entry, skipping");
        }
    }

    // `staging` drops here, releasing the temp area on every exit path.
    Ok(())
}

/// Visit every project id in the plan, detect failures, and remediate.
pub fn run_recovery_pass(
    base: &Path,
    template_root: Option<&Path>,
    plan: &RecoveryPlan,
    policy: DetectorPolicy,
) -> Result<()> {
    let aux_manifest = base.parent().map(|parent| parent.join(AUX_MANIFEST_NAME));
    for id in &plan.ids {
        let project_id = id.to_string();
        let project_dir = base.join(&project_id);
        if !needs_recovery(&project_dir, policy) {
            println!("{project_id}: clean");
            continue;
        }
        match template_root {
            Some(root) => {
                if restore_from_template(&project_dir, root, &project_id)? {
                    println!("{project_id}: failure detected, restored from template");
                } else {
                    println!("{project_id}: failure detected, no template project, skipped");
                }
            }
            None => {
                let aux = aux_manifest
                    .as_ref()
                    .map(|manifest| load_auxiliary_paths(manifest, &project_id))
                    .unwrap_or_default();
                selective_preserve_restore(&project_dir, &aux)?;
                println!("{project_id}: failure detected, preserved assets and reset");
            }
        }
    }
    Ok(())
}

/// Entry point for `caudit recover`.
pub fn run_recover(args: RecoverArgs) -> Result<()> {
    let plan = RecoveryPlan::from_args(&args)?;
    run_recovery_pass(
        &args.workspaces,
        args.template_root.as_deref(),
        &plan,
        DetectorPolicy::default(),
    )
}
