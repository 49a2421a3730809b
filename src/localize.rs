//! The `localize` run: rewrite every registry member's manifest, then compose
//! and refresh the root workspace manifest.
//!
//! Packages are processed in registry order. Nothing that happens to a single
//! package stops the run; each condition becomes a [`PackageOutcome`].
use crate::invocation::BuildInvoker;
use crate::manifest::locate_manifest;
use crate::registry::Registry;
use crate::report::{PackageOutcome, PackageReport, RootReport, RunSummary, SkipReason};
use crate::util::display_path;
use crate::workspace::{compose_root, root_manifest_path, write_root_manifest};
use std::path::Path;

/// Localize every package under `root`, then write the root manifest.
///
/// `builder` is `None` when builds are disabled; every build outcome in the
/// summary is then absent.
pub fn localize_and_compose(
    root: &Path,
    registry: &Registry,
    builder: Option<&dyn BuildInvoker>,
) -> RunSummary {
    let packages = registry
        .names()
        .map(|name| PackageReport {
            name: name.to_string(),
            outcome: process_package(root, name, registry, builder),
        })
        .collect();
    let root_report = refresh_root(root, registry, builder);
    RunSummary::new(packages, root_report)
}

fn process_package(
    root: &Path,
    name: &str,
    registry: &Registry,
    builder: Option<&dyn BuildInvoker>,
) -> PackageOutcome {
    let dir = root.join(name);
    if !dir.is_dir() {
        tracing::warn!(package = name, "directory not found, skipping");
        return PackageOutcome::Skipped {
            reason: SkipReason::DirectoryMissing,
        };
    }
    let Some(handle) = locate_manifest(&dir) else {
        tracing::warn!(package = name, "no lakefile found, skipping");
        return PackageOutcome::Skipped {
            reason: SkipReason::ManifestNotFound,
        };
    };

    tracing::debug!(
        package = name,
        upstream = registry.upstream_repo(name).unwrap_or_default(),
        manifest = %display_path(&handle.path, Some(root)),
        "localizing"
    );
    match handle.localize(registry) {
        Ok(outcome) if outcome.modified => {
            tracing::info!(
                package = name,
                manifest = %display_path(&handle.path, Some(root)),
                "updated manifest"
            );
            let build = builder.map(|builder| builder.invoke(&dir, name));
            PackageOutcome::Modified {
                format: handle.format,
                localized: outcome.localized,
                build,
            }
        }
        Ok(_) => {
            tracing::debug!(package = name, "already localized");
            PackageOutcome::Unchanged {
                format: handle.format,
            }
        }
        Err(err) => {
            tracing::error!(package = name, code = err.code(), "{err}");
            PackageOutcome::Failed {
                code: err.code().to_string(),
                error: err.to_string(),
            }
        }
    }
}

fn refresh_root(root: &Path, registry: &Registry, builder: Option<&dyn BuildInvoker>) -> RootReport {
    let composition = compose_root(root, registry);
    let path = display_path(&root_manifest_path(root), Some(root));

    let (write_error, build) = match write_root_manifest(root, &composition.spec) {
        Ok(written) => {
            tracing::info!(
                path = %written.display(),
                requires = composition.spec.requires.len(),
                "wrote root lakefile"
            );
            let build = builder.map(|builder| builder.invoke(root, &composition.spec.name));
            (None, build)
        }
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "could not write root lakefile");
            (Some(format!("{err:#}")), None)
        }
    };

    RootReport {
        path,
        name: composition.spec.name,
        version: composition.spec.version,
        requires: composition.spec.requires,
        skipped: composition.skipped,
        write_error,
        build,
    }
}
