//! Registry of packages managed locally in the workspace.
//!
//! The registry is a YAML sequence of `{name, github_org, github_repo}` records.
//! Order is significant: it drives processing order and the order of the root
//! manifest's `require` list.
use crate::error::{CrucibleError, CrucibleResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Registry location relative to the workspace root.
pub const REGISTRY_REL: &str = "_crucible/repositories.yml";

/// One locally managed package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoDescriptor {
    /// Local directory name and the key used for path rewriting.
    pub name: String,
    #[serde(rename = "github_org")]
    pub upstream_org: String,
    #[serde(rename = "github_repo")]
    pub upstream_repo: String,
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    repos: Vec<RepoDescriptor>,
    by_name: BTreeMap<String, String>,
}

impl Registry {
    /// Build a registry from descriptors, rejecting names that cannot be used
    /// as sibling directory names.
    pub fn new(repos: Vec<RepoDescriptor>) -> Result<Self, String> {
        let mut by_name = BTreeMap::new();
        for repo in &repos {
            if !is_directory_name(&repo.name) {
                return Err(format!(
                    "repository name {:?} is not a valid directory name",
                    repo.name
                ));
            }
            if by_name
                .insert(repo.name.clone(), repo.upstream_repo.clone())
                .is_some()
            {
                return Err(format!("repository name {:?} is duplicated", repo.name));
            }
        }
        Ok(Self { repos, by_name })
    }

    /// Parse registry YAML. An empty document is an empty registry.
    pub fn from_yaml(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let repos: Vec<RepoDescriptor> =
            serde_yaml::from_str(text).map_err(|err| err.to_string())?;
        Self::new(repos)
    }

    pub fn repos(&self) -> &[RepoDescriptor] {
        &self.repos
    }

    /// Names in registry order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.repos.iter().map(|repo| repo.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Upstream GitHub repository name for a managed package.
    pub fn upstream_repo(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

/// A single path component naming a sibling of the workspace root.
fn is_directory_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Default registry path for a workspace root.
pub fn default_registry_path(root: &Path) -> PathBuf {
    root.join(REGISTRY_REL)
}

/// Load the registry. A missing file is fatal for every caller.
pub fn load_registry(path: &Path) -> CrucibleResult<Registry> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CrucibleError::MissingRegistry {
                path: path.to_path_buf(),
            })
        }
        Err(err) => {
            return Err(CrucibleError::InvalidRegistry {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
        }
    };
    let registry = Registry::from_yaml(&text).map_err(|reason| CrucibleError::InvalidRegistry {
        path: path.to_path_buf(),
        reason,
    })?;
    tracing::debug!(path = %path.display(), repos = registry.len(), "registry loaded");
    Ok(registry)
}
