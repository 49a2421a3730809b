//! Root workspace manifest composition.
//!
//! The root `lakefile.toml` requires every registry member whose directory is
//! present and whose package name can be read, in registry order. Its `name`
//! and `version` survive recomposition; its `require` list never does.
use crate::error::CrucibleError;
use crate::manifest::{locate_manifest, STRUCTURED_MANIFEST};
use crate::registry::Registry;
use crate::report::SkipReason;
use crate::staging::write_atomic_text;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_WORKSPACE_NAME: &str = "crucible-workspace";
pub const DEFAULT_WORKSPACE_VERSION: &str = "0.1.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RootRequire {
    pub name: String,
    pub path: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RootManifestSpec {
    pub name: String,
    pub version: String,
    #[serde(rename = "require")]
    pub requires: Vec<RootRequire>,
}

/// A registry member left out of the root manifest.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RootSkip {
    pub directory: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub spec: RootManifestSpec,
    pub skipped: Vec<RootSkip>,
}

#[derive(Deserialize)]
struct ExistingRoot {
    name: Option<String>,
    version: Option<String>,
}

pub fn root_manifest_path(root: &Path) -> PathBuf {
    root.join(STRUCTURED_MANIFEST)
}

/// Compose the root manifest from the current state of the workspace.
pub fn compose_root(root: &Path, registry: &Registry) -> Composition {
    let (name, version) = existing_identity(&root_manifest_path(root));
    let mut requires = Vec::new();
    let mut skipped = Vec::new();

    for directory in registry.names() {
        match resolve_member(root, directory) {
            Ok(package_name) => {
                tracing::info!(package = %package_name, directory, "added to root lakefile");
                requires.push(RootRequire {
                    name: package_name,
                    path: format!("./{directory}"),
                });
            }
            Err(reason) => skipped.push(RootSkip {
                directory: directory.to_string(),
                reason,
            }),
        }
    }

    Composition {
        spec: RootManifestSpec {
            name,
            version,
            requires,
        },
        skipped,
    }
}

fn resolve_member(root: &Path, directory: &str) -> std::result::Result<String, SkipReason> {
    let dir = root.join(directory);
    if !dir.is_dir() {
        tracing::warn!(directory, "package directory not found, leaving it out of the root lakefile");
        return Err(SkipReason::DirectoryMissing);
    }
    let Some(handle) = locate_manifest(&dir) else {
        let err = CrucibleError::ManifestNotFound { dir };
        tracing::warn!(directory, "{err}, skipping");
        return Err(SkipReason::ManifestNotFound);
    };
    handle.package_name().ok_or_else(|| {
        let err = CrucibleError::NameExtractionFailed {
            manifest: handle.path.clone(),
        };
        tracing::warn!(directory, "{err}, skipping");
        SkipReason::NameExtractionFailed
    })
}

/// `name` and `version` of an existing root manifest, or the defaults.
fn existing_identity(path: &Path) -> (String, String) {
    let mut name = DEFAULT_WORKSPACE_NAME.to_string();
    let mut version = DEFAULT_WORKSPACE_VERSION.to_string();
    if !path.is_file() {
        return (name, version);
    }
    let parsed = fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|text| toml::from_str::<ExistingRoot>(&text).map_err(|err| err.to_string()));
    match parsed {
        Ok(existing) => {
            if let Some(existing_name) = existing.name {
                name = existing_name;
            }
            if let Some(existing_version) = existing.version {
                version = existing_version;
            }
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not read existing root lakefile");
        }
    }
    (name, version)
}

/// Serialize and write the root manifest. Always rewrites the file.
pub fn write_root_manifest(root: &Path, spec: &RootManifestSpec) -> Result<PathBuf> {
    let path = root_manifest_path(root);
    let text = toml::to_string(spec).context("serialize root lakefile")?;
    write_atomic_text(&path, &text).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
