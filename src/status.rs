//! Read-only workspace status.
//!
//! Reports, per registry member, what `localize` would find: the directory,
//! its manifest, the declared package name, and which managed dependencies
//! still point somewhere other than the sibling checkout. Nothing is written.
use crate::manifest::{locate_manifest, ManifestFormat, RequirementClause};
use crate::registry::{Registry, RepoDescriptor};
use crate::util::plural;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageStatus {
    pub name: String,
    /// `org/repo` the checkout tracks.
    pub upstream: String,
    pub directory_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<ManifestFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package_name: Option<String>,
    pub requirements: Vec<RequirementClause>,
    /// Managed dependencies not yet declared as `../<name>`.
    pub pending: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PackageStatus {
    fn absent(repo: &RepoDescriptor, directory_present: bool) -> Self {
        Self {
            name: repo.name.clone(),
            upstream: format!("{}/{}", repo.upstream_org, repo.upstream_repo),
            directory_present,
            format: None,
            package_name: None,
            requirements: Vec::new(),
            pending: Vec::new(),
            error: None,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceStatus {
    pub packages: Vec<PackageStatus>,
    pub pending_total: usize,
}

pub fn workspace_status(root: &Path, registry: &Registry) -> WorkspaceStatus {
    let packages: Vec<PackageStatus> = registry
        .repos()
        .iter()
        .map(|repo| package_status(root, repo, registry))
        .collect();
    let pending_total = packages.iter().map(|package| package.pending.len()).sum();
    WorkspaceStatus {
        packages,
        pending_total,
    }
}

fn package_status(root: &Path, repo: &RepoDescriptor, registry: &Registry) -> PackageStatus {
    let dir = root.join(&repo.name);
    if !dir.is_dir() {
        return PackageStatus::absent(repo, false);
    }
    let Some(handle) = locate_manifest(&dir) else {
        return PackageStatus::absent(repo, true);
    };

    let mut status = PackageStatus::absent(repo, true);
    status.format = Some(handle.format);
    status.package_name = handle.package_name();
    match handle.requirement_clauses() {
        Ok(requirements) => {
            status.pending = requirements
                .iter()
                .filter(|clause| registry.contains(&clause.declared_name) && !clause.is_localized())
                .map(|clause| clause.declared_name.clone())
                .collect();
            status.requirements = requirements;
        }
        Err(err) => {
            tracing::warn!(package = %repo.name, code = err.code(), "{err}");
            status.error = Some(err.to_string());
        }
    }
    status
}

pub fn render_status(status: &WorkspaceStatus) -> String {
    let name_width = status
        .packages
        .iter()
        .map(|package| package.name.len())
        .max()
        .unwrap_or(0)
        .max("package".len());

    let mut out = format!(
        "{:<name_width$}  {:<13}  {:<20}  pending\n",
        "package", "manifest", "name"
    );
    for package in &status.packages {
        let manifest = match (package.directory_present, package.format) {
            (false, _) => "missing dir",
            (true, None) => "none",
            (true, Some(format)) => format.file_name(),
        };
        let pending = match &package.error {
            Some(error) => format!("error: {error}"),
            None if package.pending.is_empty() => "-".to_string(),
            None => package.pending.join(", "),
        };
        out.push_str(&format!(
            "{:<name_width$}  {:<13}  {:<20}  {}\n",
            package.name,
            manifest,
            package.package_name.as_deref().unwrap_or("-"),
            pending
        ));
    }
    if status.pending_total == 0 {
        out.push_str("All managed dependencies are localized.\n");
    } else {
        out.push_str(&format!(
            "{} pending localization; run `crucible localize`.\n",
            plural(status.pending_total, "dependency declaration")
        ));
    }
    out
}
