//! End-to-end runs of `crucible localize` against temporary workspaces.

mod common;

use common::{stderr, stdout, Workspace};

fn requirement<'a>(manifest: &'a toml::Value, name: &str) -> &'a toml::Value {
    manifest["require"]
        .as_array()
        .and_then(|entries| entries.iter().find(|entry| entry["name"].as_str() == Some(name)))
        .unwrap_or_else(|| panic!("requirement {name} missing"))
}

#[test]
fn localize_rewrites_manifests_and_writes_root() {
    let workspace = Workspace::new().expect("create workspace");

    let output = workspace.run(&["localize", "--no-build"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let core_text = workspace.read("core/lakefile.toml");
    assert!(core_text.contains("# pinned until the next release\n"));
    let core: toml::Value = toml::from_str(&core_text).expect("parse core lakefile");
    let std_entry = requirement(&core, "std");
    assert_eq!(std_entry["path"].as_str(), Some("../std"));
    assert!(std_entry.get("git").is_none());
    assert!(std_entry.get("rev").is_none());
    assert_eq!(
        requirement(&core, "mathlib")["git"].as_str(),
        Some("https://example.com/mathlib4")
    );

    assert_eq!(
        workspace.read("std/lakefile.lean"),
        common::STD_LAKEFILE.replace(
            "require \"example\" / \"core\" @ git \"main\"",
            "require core from \"../core\""
        )
    );

    let root: toml::Value =
        toml::from_str(&workspace.read("lakefile.toml")).expect("parse root lakefile");
    assert_eq!(root["name"].as_str(), Some("crucible-workspace"));
    assert_eq!(root["version"].as_str(), Some("0.1.0"));
    let requires = root["require"].as_array().expect("require array");
    let pairs: Vec<(&str, &str)> = requires
        .iter()
        .map(|entry| {
            (
                entry["name"].as_str().unwrap_or_default(),
                entry["path"].as_str().unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(pairs, vec![("Core", "./core"), ("std", "./std")]);

    let text = stdout(&output);
    assert!(text.contains("Modified 2 repository lakefiles (0 unchanged)"), "{text}");
    assert!(text.contains("Skipped ghost"), "{text}");
    assert!(text.contains("Workspace manifest update skipped"), "{text}");
}

#[test]
fn second_run_reports_no_modifications() {
    let workspace = Workspace::new().expect("create workspace");
    let first = workspace.run(&["localize", "--no-build"]);
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    let core_after_first = workspace.read("core/lakefile.toml");
    let std_after_first = workspace.read("std/lakefile.lean");

    let second = workspace.run(&["localize", "--no-build", "--json"]);
    assert!(second.status.success(), "stderr: {}", stderr(&second));
    let summary: serde_json::Value =
        serde_json::from_str(&stdout(&second)).expect("parse summary json");
    assert_eq!(summary["totals"]["modified"], 0);
    assert_eq!(summary["totals"]["unchanged"], 2);
    assert_eq!(summary["totals"]["skipped"], 1);
    assert_eq!(workspace.read("core/lakefile.toml"), core_after_first);
    assert_eq!(workspace.read("std/lakefile.lean"), std_after_first);
}

#[test]
fn existing_root_identity_is_preserved() {
    let workspace = Workspace::new().expect("create workspace");
    workspace
        .write("lakefile.toml", "name = \"foo\"\nversion = \"2.0\"\n")
        .expect("write root");

    let output = workspace.run(&["localize", "--no-build"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let root: toml::Value =
        toml::from_str(&workspace.read("lakefile.toml")).expect("parse root lakefile");
    assert_eq!(root["name"].as_str(), Some("foo"));
    assert_eq!(root["version"].as_str(), Some("2.0"));
    assert_eq!(root["require"].as_array().map(Vec::len), Some(2));
}

#[test]
fn missing_registry_is_fatal() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_crucible"))
        .args(["localize", "--no-build", "--root"])
        .arg(dir.path())
        .output()
        .expect("run crucible");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("registry not found"));
    assert!(!dir.path().join("lakefile.toml").exists());
}

#[cfg(unix)]
#[test]
fn builds_run_in_modified_packages_and_root() {
    let workspace = Workspace::new().expect("create workspace");

    let output = workspace.run(&["localize", "--build-command", "sh -c 'touch built'"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    assert!(workspace.path("core/built").is_file());
    assert!(workspace.path("std/built").is_file());
    assert!(workspace.path("built").is_file());
    assert!(stdout(&output).contains("Updated workspace manifest successfully"));
}

#[cfg(unix)]
#[test]
fn failed_builds_only_fail_the_run_under_strict() {
    let workspace = Workspace::new().expect("create workspace");
    let lenient = workspace.run(&["localize", "--build-command", "false"]);
    assert!(lenient.status.success(), "stderr: {}", stderr(&lenient));
    assert!(stdout(&lenient).contains("3 build invocations did not succeed"));

    let workspace = Workspace::new().expect("create workspace");
    let strict = workspace.run(&["localize", "--build-command", "false", "--strict", "--json"]);
    assert_eq!(strict.status.code(), Some(1));
    let summary: serde_json::Value =
        serde_json::from_str(&stdout(&strict)).expect("parse summary json");
    assert_eq!(summary["totals"]["builds_failed"], 3);
    assert_eq!(summary["root"]["build"]["status"], "failed");
}

#[cfg(unix)]
#[test]
fn slow_builds_time_out_and_the_run_completes() {
    let workspace = Workspace::new().expect("create workspace");

    let output = workspace.run(&[
        "localize",
        "--build-command",
        "sleep 30",
        "--build-timeout-secs",
        "1",
        "--json",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let summary: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("parse summary json");
    assert_eq!(summary["packages"][0]["build"]["status"], "timed_out");
    assert_eq!(summary["root"]["build"]["status"], "timed_out");
    assert!(workspace.path("lakefile.toml").is_file());
}
