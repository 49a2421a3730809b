//! Conditions raised while localizing a workspace.
//!
//! Only the registry conditions are fatal; everything else is caught at the
//! package boundary and folded into the run report.
use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CrucibleError {
    #[error("registry not found at {}", path.display())]
    MissingRegistry { path: PathBuf },
    #[error("registry {} is invalid: {reason}", path.display())]
    InvalidRegistry { path: PathBuf, reason: String },
    #[error("no lakefile.toml or lakefile.lean in {}", dir.display())]
    ManifestNotFound { dir: PathBuf },
    #[error("could not determine package name from {}", manifest.display())]
    NameExtractionFailed { manifest: PathBuf },
    #[error("malformed manifest {}: {reason}", path.display())]
    ManifestParse { path: PathBuf, reason: String },
    #[error("rewrite {} failed: {source}", path.display())]
    RewriteIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CrucibleError {
    /// Stable short code used in JSON reports.
    pub fn code(&self) -> &'static str {
        match self {
            CrucibleError::MissingRegistry { .. } => "missing_registry",
            CrucibleError::InvalidRegistry { .. } => "invalid_registry",
            CrucibleError::ManifestNotFound { .. } => "manifest_not_found",
            CrucibleError::NameExtractionFailed { .. } => "name_extraction_failed",
            CrucibleError::ManifestParse { .. } => "manifest_parse",
            CrucibleError::RewriteIo { .. } => "rewrite_io",
        }
    }
}

pub type CrucibleResult<T> = std::result::Result<T, CrucibleError>;
