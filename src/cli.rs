//! CLI argument parsing for the audit workflow.
//!
//! The CLI is intentionally thin: it selects a corpus or workspace root and
//! hands off to the batch and recovery entry points without embedding policy.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint for benchmark aggregation and recovery.
#[derive(Parser, Debug)]
#[command(
    name = "caudit",
    version,
    about = "Score aggregation and workspace recovery for code-generation benchmarks",
    after_help = "Commands:\n  aggregate --corpus <dir>                 Score every project and write aggregate_report.json\n  recover --workspaces <dir> ...           Detect failed runs and reset their workspaces\n\nExamples:\n  caudit aggregate --corpus /data/corpus\n  caudit aggregate --corpus /data/corpus --keep-invalid\n  caudit recover --workspaces /data/workspaces --from 1 --to 50\n  caudit recover --workspaces /data/workspaces --ids 3,17 --template-root /data/templates",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level workflow commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Aggregate(AggregateArgs),
    Recover(RecoverArgs),
}

/// Aggregate command inputs for one corpus pass.
#[derive(Parser, Debug)]
#[command(about = "Aggregate metric reports across all projects in a corpus")]
pub struct AggregateArgs {
    /// Corpus root containing one subdirectory per project
    #[arg(long, value_name = "DIR")]
    pub corpus: PathBuf,

    /// Keep malformed reports in place instead of deleting them
    #[arg(long)]
    pub keep_invalid: bool,
}

/// Recover command inputs for one recovery pass.
#[derive(Parser, Debug)]
#[command(about = "Detect failed generation attempts and reset their workspaces")]
pub struct RecoverArgs {
    /// Workspace base path containing one directory per project id
    #[arg(long, value_name = "DIR")]
    pub workspaces: PathBuf,

    /// Template corpus root; when set, recovery is a full template reset
    #[arg(long, value_name = "DIR")]
    pub template_root: Option<PathBuf>,

    /// First project id to visit (inclusive)
    #[arg(long, value_name = "N", requires = "to", conflicts_with = "ids")]
    pub from: Option<u32>,

    /// Last project id to visit (inclusive)
    #[arg(long, value_name = "N", requires = "from", conflicts_with = "ids")]
    pub to: Option<u32>,

    /// Explicit comma-separated project ids to visit
    #[arg(long, value_name = "IDS", value_delimiter = ',')]
    pub ids: Option<Vec<u32>>,
}
