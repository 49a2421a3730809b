//! CLI argument parsing for workspace localization.
use crate::invocation::DEFAULT_BUILD_TIMEOUT_SECS;
use crate::registry::default_registry_path;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "crucible",
    version,
    about = "Localize Lake package dependencies across a checked-out workspace",
    after_help = "Commands:\n  localize  Point registry dependencies at sibling checkouts and write the root lakefile.toml\n  status    Show which managed dependencies still need localizing\n  clean     Delete checkout artifacts and registry package directories\n\nExamples:\n  crucible localize\n  crucible localize --root ~/ws --no-build --json\n  crucible status --json\n  crucible clean --dry-run",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Localize(LocalizeArgs),
    Status(StatusArgs),
    Clean(CleanArgs),
}

impl Command {
    pub fn verbose(&self) -> bool {
        match self {
            Command::Localize(args) => args.verbose,
            Command::Status(args) => args.verbose,
            Command::Clean(args) => args.verbose,
        }
    }
}

/// Workspace location shared by every command.
#[derive(Args, Debug, Clone)]
pub struct WorkspaceArgs {
    /// Workspace root containing the package checkouts
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Registry of managed packages [default: <root>/_crucible/repositories.yml]
    #[arg(long, value_name = "PATH")]
    pub registry: Option<PathBuf>,
}

impl WorkspaceArgs {
    pub fn registry_path(&self) -> PathBuf {
        self.registry
            .clone()
            .unwrap_or_else(|| default_registry_path(&self.root))
    }
}

#[derive(Parser, Debug)]
#[command(about = "Rewrite package lakefiles to local paths and compose the root lakefile")]
pub struct LocalizeArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Command run after each manifest change [env: CRUCIBLE_BUILD_COMMAND] [default: lake update]
    #[arg(long, value_name = "CMD")]
    pub build_command: Option<String>,

    /// Seconds before a build invocation is killed
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_BUILD_TIMEOUT_SECS)]
    pub build_timeout_secs: u64,

    /// Skip every build invocation
    #[arg(long, conflicts_with = "build_command")]
    pub no_build: bool,

    /// Emit the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit non-zero when a rewrite, the root write, or a build did not succeed
    #[arg(long)]
    pub strict: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Summarize manifest state for every registry package (read-only)")]
pub struct StatusArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Delete workspace artifacts and registry package directories")]
pub struct CleanArgs {
    #[command(flatten)]
    pub workspace: WorkspaceArgs,

    /// List what would be deleted without deleting it
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,
}
