//! Command handlers. Each loads the registry, runs one operation, and prints
//! its report to stdout; logs go to stderr.
use crate::clean::clean_workspace;
use crate::cli::{CleanArgs, LocalizeArgs, StatusArgs, WorkspaceArgs};
use crate::invocation::{resolve_build_command, BuildInvoker, CommandInvoker};
use crate::localize::localize_and_compose;
use crate::registry::{load_registry, Registry};
use crate::status::{render_status, workspace_status};
use anyhow::{anyhow, Context, Result};
use std::process::ExitCode;
use std::time::Duration;

pub fn run_localize(args: &LocalizeArgs) -> Result<ExitCode> {
    let registry = load_workspace_registry(&args.workspace)?;
    let invoker = if args.no_build {
        tracing::info!("builds disabled");
        None
    } else {
        let command_line = resolve_build_command(args.build_command.as_deref());
        let timeout = Duration::from_secs(args.build_timeout_secs);
        Some(CommandInvoker::new(&command_line, timeout)?)
    };

    let summary = localize_and_compose(
        &args.workspace.root,
        &registry,
        invoker.as_ref().map(|invoker| invoker as &dyn BuildInvoker),
    );

    if args.json {
        let text = serde_json::to_string_pretty(&summary).context("serialize run summary")?;
        println!("{text}");
    } else {
        print!("{}", summary.render());
    }

    if args.strict && summary.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn run_status(args: &StatusArgs) -> Result<()> {
    let registry = load_workspace_registry(&args.workspace)?;
    let status = workspace_status(&args.workspace.root, &registry);
    if args.json {
        let text = serde_json::to_string_pretty(&status).context("serialize status")?;
        println!("{text}");
    } else {
        print!("{}", render_status(&status));
    }
    Ok(())
}

pub fn run_clean(args: &CleanArgs) -> Result<()> {
    let registry = load_workspace_registry(&args.workspace)?;
    let report = clean_workspace(&args.workspace.root, &registry, args.dry_run)?;
    print!("{}", report.render());
    Ok(())
}

fn load_workspace_registry(workspace: &WorkspaceArgs) -> Result<Registry> {
    if !workspace.root.is_dir() {
        return Err(anyhow!(
            "workspace root {} is not a directory",
            workspace.root.display()
        ));
    }
    let path = workspace.registry_path();
    let registry = load_registry(&path)?;
    if registry.is_empty() {
        tracing::warn!(path = %path.display(), "registry lists no packages");
    }
    Ok(registry)
}
