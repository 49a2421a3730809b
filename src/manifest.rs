//! Lake manifests: locating them, reading their identity, and localizing the
//! dependencies they declare on registry members.
//!
//! Two dialects are supported. `lakefile.toml` is handled through a
//! format-preserving TOML document; `lakefile.lean` through a small lexer and
//! clause recognizer that only understands `require` and `package` clauses.
use crate::error::{CrucibleError, CrucibleResult};
use crate::registry::Registry;
use crate::staging::write_atomic_text;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

mod structured;
mod text;

pub const STRUCTURED_MANIFEST: &str = "lakefile.toml";
pub const TEXT_MANIFEST: &str = "lakefile.lean";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestFormat {
    /// `lakefile.toml`
    Structured,
    /// `lakefile.lean`
    TextBased,
}

impl ManifestFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ManifestFormat::Structured => STRUCTURED_MANIFEST,
            ManifestFormat::TextBased => TEXT_MANIFEST,
        }
    }
}

/// The authoritative manifest of one package directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestHandle {
    pub path: PathBuf,
    pub format: ManifestFormat,
}

/// Remote-source fields a dependency may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoteFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequirementSource {
    RemoteGit(RemoteFields),
    LocalPath { path: String },
    Unspecified,
}

/// One dependency declaration, in either dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementClause {
    pub declared_name: String,
    pub source: RequirementSource,
}

impl RequirementClause {
    /// Whether the clause already points at the sibling checkout.
    pub fn is_localized(&self) -> bool {
        matches!(
            &self.source,
            RequirementSource::LocalPath { path } if *path == local_path(&self.declared_name)
        )
    }
}

/// Result of localizing one manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalizeOutcome {
    pub modified: bool,
    /// Dependencies whose declaration changed, in manifest order.
    pub localized: Vec<String>,
}

/// Relative path from one package directory to a sibling package.
pub fn local_path(name: &str) -> String {
    format!("../{name}")
}

/// Find the manifest for a package directory. `lakefile.toml` wins when both
/// dialects are present.
pub fn locate_manifest(dir: &Path) -> Option<ManifestHandle> {
    [ManifestFormat::Structured, ManifestFormat::TextBased]
        .into_iter()
        .map(|format| ManifestHandle {
            path: dir.join(format.file_name()),
            format,
        })
        .find(|handle| handle.path.is_file())
}

impl ManifestHandle {
    fn read(&self) -> CrucibleResult<String> {
        fs::read_to_string(&self.path).map_err(|source| CrucibleError::RewriteIo {
            path: self.path.clone(),
            source,
        })
    }

    /// Declared package name, or `None` when it cannot be determined.
    pub fn package_name(&self) -> Option<String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    manifest = %self.path.display(),
                    error = %err,
                    "could not read manifest"
                );
                return None;
            }
        };
        match self.format {
            ManifestFormat::Structured => structured::package_name(&content),
            ManifestFormat::TextBased => text::package_name(&content),
        }
    }

    /// Every dependency declaration the manifest contains.
    pub fn requirement_clauses(&self) -> CrucibleResult<Vec<RequirementClause>> {
        let content = self.read()?;
        match self.format {
            ManifestFormat::Structured => {
                structured::clauses(&content).map_err(|reason| CrucibleError::ManifestParse {
                    path: self.path.clone(),
                    reason,
                })
            }
            ManifestFormat::TextBased => Ok(text::clauses(&content)),
        }
    }

    /// Rewrite declarations of registry members to sibling paths. The file is
    /// only written when its content changes.
    pub fn localize(&self, registry: &Registry) -> CrucibleResult<LocalizeOutcome> {
        let content = self.read()?;
        let rewrite = match self.format {
            ManifestFormat::Structured => structured::localize(&content, registry).map_err(
                |reason| CrucibleError::ManifestParse {
                    path: self.path.clone(),
                    reason,
                },
            )?,
            ManifestFormat::TextBased => text::localize(&content, registry),
        };
        if rewrite.modified {
            write_atomic_text(&self.path, &rewrite.text).map_err(|source| {
                CrucibleError::RewriteIo {
                    path: self.path.clone(),
                    source,
                }
            })?;
        }
        Ok(LocalizeOutcome {
            modified: rewrite.modified,
            localized: rewrite.localized,
        })
    }
}

/// Rewritten manifest text produced by either dialect.
#[derive(Debug)]
struct Rewrite {
    text: String,
    modified: bool,
    localized: Vec<String>,
}
