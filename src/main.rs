use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod clean;
mod cli;
mod error;
mod invocation;
mod localize;
mod manifest;
mod registry;
mod report;
mod staging;
mod status;
mod util;
mod workflow;
mod workspace;

use cli::{Command, RootArgs};

fn main() -> Result<ExitCode> {
    let args = RootArgs::parse();
    init_logging(args.command.verbose());

    match &args.command {
        Command::Localize(args) => workflow::run_localize(args),
        Command::Status(args) => workflow::run_status(args).map(|()| ExitCode::SUCCESS),
        Command::Clean(args) => workflow::run_clean(args).map(|()| ExitCode::SUCCESS),
    }
}

/// Logs go to stderr so stdout carries only reports. `RUST_LOG` overrides the
/// level chosen by `--verbose`.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
