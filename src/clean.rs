//! Remove the workspace artifacts produced by checkout and localize.
use crate::registry::Registry;
use crate::util::display_path;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Root-level files owned by the workspace tooling, in removal order.
pub const ROOT_ARTIFACTS: [&str; 4] = [
    "checkout.yaml",
    "lakefile.toml",
    "lake-manifest.json",
    "lean-toolchain",
];

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub dry_run: bool,
    /// Removed, or that would be removed under `--dry-run`.
    pub removed: Vec<String>,
    pub missing: Vec<String>,
}

impl CleanReport {
    pub fn render(&self) -> String {
        let verb = if self.dry_run { "Would delete" } else { "Deleted" };
        let mut out = String::new();
        for path in &self.removed {
            out.push_str(&format!("{verb} {path}\n"));
        }
        for path in &self.missing {
            out.push_str(&format!("{path} does not exist, skipping.\n"));
        }
        out
    }
}

enum Target {
    File(PathBuf),
    Dir(PathBuf),
}

pub fn clean_workspace(root: &Path, registry: &Registry, dry_run: bool) -> Result<CleanReport> {
    let targets = ROOT_ARTIFACTS
        .iter()
        .map(|name| Target::File(root.join(name)))
        .chain(registry.names().map(|name| Target::Dir(root.join(name))));

    let mut report = CleanReport {
        dry_run,
        ..CleanReport::default()
    };
    for target in targets {
        let (path, present) = match &target {
            Target::File(path) => (path, path.is_file()),
            Target::Dir(path) => (path, path.is_dir()),
        };
        let shown = display_path(path, Some(root));
        if !present {
            tracing::debug!(path = %shown, "not present");
            report.missing.push(shown);
            continue;
        }
        if !dry_run {
            match &target {
                Target::File(path) => fs::remove_file(path),
                Target::Dir(path) => fs::remove_dir_all(path),
            }
            .with_context(|| format!("delete {}", path.display()))?;
            tracing::info!(path = %shown, "deleted");
        }
        report.removed.push(shown);
    }
    Ok(report)
}
