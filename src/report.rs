//! Run reports for `localize`, rendered as a human summary or JSON.
use crate::invocation::BuildOutcome;
use crate::manifest::ManifestFormat;
use crate::util::plural;
use crate::workspace::{RootRequire, RootSkip};
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    DirectoryMissing,
    ManifestNotFound,
    NameExtractionFailed,
}

impl SkipReason {
    pub fn describe(self) -> &'static str {
        match self {
            SkipReason::DirectoryMissing => "directory not found (run checkout first)",
            SkipReason::ManifestNotFound => "no lakefile.toml or lakefile.lean found",
            SkipReason::NameExtractionFailed => "could not determine package name",
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackageOutcome {
    Modified {
        format: ManifestFormat,
        localized: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        build: Option<BuildOutcome>,
    },
    Unchanged {
        format: ManifestFormat,
    },
    Skipped {
        reason: SkipReason,
    },
    /// The manifest could not be read, parsed, or written.
    Failed {
        code: String,
        error: String,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PackageReport {
    pub name: String,
    #[serde(flatten)]
    pub outcome: PackageOutcome,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RootReport {
    pub path: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "require")]
    pub requires: Vec<RootRequire>,
    pub skipped: Vec<RootSkip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildOutcome>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub packages: Vec<PackageReport>,
    pub root: RootReport,
    pub totals: Totals,
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub modified: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub builds_succeeded: usize,
    pub builds_failed: usize,
}

impl Totals {
    pub fn tally(packages: &[PackageReport], root: &RootReport) -> Self {
        let mut totals = Totals::default();
        for package in packages {
            match &package.outcome {
                PackageOutcome::Modified { build, .. } => {
                    totals.modified += 1;
                    totals.count_build(build.as_ref());
                }
                PackageOutcome::Unchanged { .. } => totals.unchanged += 1,
                PackageOutcome::Skipped { .. } => totals.skipped += 1,
                PackageOutcome::Failed { .. } => totals.failed += 1,
            }
        }
        totals.count_build(root.build.as_ref());
        totals
    }

    fn count_build(&mut self, build: Option<&BuildOutcome>) {
        match build {
            Some(outcome) if outcome.succeeded() => self.builds_succeeded += 1,
            Some(_) => self.builds_failed += 1,
            None => {}
        }
    }
}

impl RunSummary {
    pub fn new(packages: Vec<PackageReport>, root: RootReport) -> Self {
        let totals = Totals::tally(&packages, &root);
        Self {
            packages,
            root,
            totals,
        }
    }

    /// Anything `--strict` treats as a failed run.
    pub fn has_failures(&self) -> bool {
        self.totals.failed > 0 || self.totals.builds_failed > 0 || self.root.write_error.is_some()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Summary:\n");
        out.push_str(&format!(
            "  Modified {} ({} unchanged)\n",
            plural(self.totals.modified, "repository lakefile"),
            self.totals.unchanged
        ));
        for package in &self.packages {
            match &package.outcome {
                PackageOutcome::Modified {
                    localized, build, ..
                } => {
                    out.push_str(&format!(
                        "    {}: localized {}",
                        package.name,
                        localized.join(", ")
                    ));
                    if let Some(build) = build {
                        out.push_str(&format!("; build {}", build.describe()));
                    }
                    out.push('\n');
                }
                PackageOutcome::Skipped { reason } => {
                    out.push_str(&format!("  Skipped {}: {}\n", package.name, reason.describe()));
                }
                PackageOutcome::Failed { error, .. } => {
                    out.push_str(&format!("  Failed {}: {}\n", package.name, error));
                }
                PackageOutcome::Unchanged { .. } => {}
            }
        }

        match &self.root.write_error {
            None => out.push_str(&format!(
                "  Created/updated root {} with {}\n",
                self.root.path,
                plural(self.root.requires.len(), "package")
            )),
            Some(error) => out.push_str(&format!(
                "  Failed to write root {}: {}\n",
                self.root.path, error
            )),
        }
        for skip in &self.root.skipped {
            out.push_str(&format!(
                "    left out {}: {}\n",
                skip.directory,
                skip.reason.describe()
            ));
        }
        match &self.root.build {
            Some(build) if build.succeeded() => {
                out.push_str("  Updated workspace manifest successfully\n")
            }
            Some(build) => out.push_str(&format!(
                "  Warning: workspace manifest update {}\n",
                build.describe()
            )),
            None => out.push_str("  Workspace manifest update skipped\n"),
        }
        if self.totals.builds_failed > 0 {
            out.push_str(&format!(
                "  {} did not succeed\n",
                plural(self.totals.builds_failed, "build invocation")
            ));
        }
        out
    }
}
