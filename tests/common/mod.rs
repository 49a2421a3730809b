//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const REGISTRY: &str = "\
- name: core
  github_org: example
  github_repo: core
- name: std
  github_org: example
  github_repo: std4
- name: ghost
  github_org: example
  github_repo: ghost
";

pub const CORE_LAKEFILE: &str = "\
name = \"Core\"
version = \"0.3.0\"

# pinned until the next release
[[require]]
name = \"std\"
git = \"https://example.com/std4\"
rev = \"abc123\"

[[require]]
name = \"mathlib\"
git = \"https://example.com/mathlib4\"
";

pub const STD_LAKEFILE: &str = "\
import Lake
open Lake DSL

package std where

require \"example\" / \"core\" @ git \"main\"
";

/// A temporary Lake workspace: `core` (toml), `std` (lean), and a registry
/// that also lists the never-checked-out `ghost`.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> anyhow::Result<Self> {
        let workspace = Self {
            dir: TempDir::new()?,
        };
        workspace.write("_crucible/repositories.yml", REGISTRY)?;
        workspace.write("core/lakefile.toml", CORE_LAKEFILE)?;
        workspace.write("std/lakefile.lean", STD_LAKEFILE)?;
        Ok(workspace)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) -> anyhow::Result<()> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel))
            .unwrap_or_else(|err| panic!("read {rel}: {err}"))
    }

    /// Run `crucible <args> --root <workspace>`.
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_crucible"))
            .args(args)
            .arg("--root")
            .arg(self.root())
            .env_remove("CRUCIBLE_BUILD_COMMAND")
            .env_remove("RUST_LOG")
            .output()
            .expect("run crucible")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
