use anyhow::Result;
use clap::Parser;

mod agent;
mod aggregate;
mod batch;
mod cli;
mod detect;
mod manifest;
mod recover;
mod report;
mod util;

use cli::{Command, RootArgs};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    match args.command {
        Command::Aggregate(args) => batch::run_aggregate(args),
        Command::Recover(args) => recover::run_recover(args),
    }
}
