//! `lakefile.toml` handling.
//!
//! Rewrites go through `toml_edit` so comments, key order and untouched
//! entries survive byte-for-byte.
use super::{local_path, RemoteFields, RequirementClause, RequirementSource, Rewrite};
use crate::registry::Registry;
use serde::Deserialize;
use toml_edit::{DocumentMut, Item, TableLike, Value};

/// Keys that point a requirement at a remote source.
const REMOTE_KEYS: [&str; 5] = ["git", "url", "rev", "version", "scope"];

#[derive(Deserialize)]
struct PackageHeader {
    name: Option<String>,
}

pub(super) fn package_name(content: &str) -> Option<String> {
    match toml::from_str::<PackageHeader>(content) {
        Ok(header) => header.name,
        Err(err) => {
            tracing::warn!(error = %err, "could not parse lakefile.toml");
            None
        }
    }
}

pub(super) fn localize(content: &str, registry: &Registry) -> Result<Rewrite, String> {
    let mut doc: DocumentMut = content.parse().map_err(|err| format!("{err}"))?;
    let mut changes = 0;
    let mut localized = Vec::new();

    for_each_requirement_mut(&mut doc, |entry| {
        let Some(name) = entry.get("name").and_then(Item::as_str).map(str::to_string) else {
            return;
        };
        if !registry.contains(&name) {
            return;
        }
        let entry_changes = localize_entry(entry, &name);
        if entry_changes > 0 {
            tracing::info!(dependency = %name, path = %local_path(&name), "localized requirement");
            changes += entry_changes;
            localized.push(name);
        }
    });

    let modified = changes > 0;
    let text = if modified {
        doc.to_string()
    } else {
        content.to_string()
    };
    Ok(Rewrite {
        text,
        modified,
        localized,
    })
}

/// Drop remote fields and point `path` at the sibling checkout. Returns the
/// number of individual modifications.
fn localize_entry(entry: &mut dyn TableLike, name: &str) -> usize {
    let mut changes = 0;
    for key in REMOTE_KEYS {
        if entry.remove(key).is_some() {
            changes += 1;
        }
    }

    let canonical = local_path(name);
    match entry.get_mut("path") {
        Some(item) if item.as_str() == Some(canonical.as_str()) => {}
        Some(item) => {
            let mut replacement = Value::from(canonical);
            if let Some(previous) = item.as_value() {
                *replacement.decor_mut() = previous.decor().clone();
            }
            *item = Item::Value(replacement);
            changes += 1;
        }
        None => {
            entry.insert("path", toml_edit::value(canonical));
            changes += 1;
        }
    }
    changes
}

fn for_each_requirement_mut(doc: &mut DocumentMut, mut visit: impl FnMut(&mut dyn TableLike)) {
    match doc.get_mut("require") {
        Some(Item::ArrayOfTables(tables)) => {
            for table in tables.iter_mut() {
                visit(table);
            }
        }
        Some(Item::Value(Value::Array(array))) => {
            for value in array.iter_mut() {
                if let Some(table) = value.as_inline_table_mut() {
                    visit(table);
                }
            }
        }
        _ => {}
    }
}

pub(super) fn clauses(content: &str) -> Result<Vec<RequirementClause>, String> {
    let doc: DocumentMut = content.parse().map_err(|err| format!("{err}"))?;
    let mut clauses = Vec::new();
    let mut collect = |entry: &dyn TableLike| {
        if let Some(clause) = clause_from_entry(entry) {
            clauses.push(clause);
        }
    };
    match doc.get("require") {
        Some(Item::ArrayOfTables(tables)) => tables.iter().for_each(|table| collect(table)),
        Some(Item::Value(Value::Array(array))) => array
            .iter()
            .filter_map(Value::as_inline_table)
            .for_each(|table| collect(table)),
        _ => {}
    }
    Ok(clauses)
}

fn clause_from_entry(entry: &dyn TableLike) -> Option<RequirementClause> {
    let field = |key: &str| entry.get(key).and_then(Item::as_str).map(str::to_string);
    let declared_name = field("name")?;
    let remote = RemoteFields {
        git: field("git"),
        url: field("url"),
        rev: field("rev"),
        version: field("version"),
        scope: field("scope"),
    };
    let source = if remote != RemoteFields::default() {
        RequirementSource::RemoteGit(remote)
    } else if let Some(path) = field("path") {
        RequirementSource::LocalPath { path }
    } else {
        RequirementSource::Unspecified
    };
    Some(RequirementClause {
        declared_name,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RepoDescriptor;

    fn registry(names: &[&str]) -> Registry {
        Registry::new(
            names
                .iter()
                .map(|name| RepoDescriptor {
                    name: name.to_string(),
                    upstream_org: "org".to_string(),
                    upstream_repo: name.to_string(),
                })
                .collect(),
        )
        .expect("valid registry")
    }

    fn requirement<'a>(doc: &'a DocumentMut, name: &str) -> &'a toml_edit::Table {
        doc["require"]
            .as_array_of_tables()
            .expect("require tables")
            .iter()
            .find(|table| table.get("name").and_then(Item::as_str) == Some(name))
            .expect("requirement present")
    }

    const MANIFEST: &str = r#"name = "app"
version = "0.3.0"

# pinned upstream
[[require]]
name = "core"
git = "https://x"
rev = "abc123"

[[require]]
# not managed here
name = "unrelated"
git    = "https://z"   # keep spacing
"#;

    #[test]
    fn localizes_managed_entry_and_drops_remote_fields() {
        let rewrite = localize(MANIFEST, &registry(&["core"])).expect("localize");
        assert!(rewrite.modified);
        assert_eq!(rewrite.localized, vec!["core".to_string()]);

        let doc: DocumentMut = rewrite.text.parse().expect("reparse");
        let core = requirement(&doc, "core");
        assert_eq!(core.get("path").and_then(Item::as_str), Some("../core"));
        for key in REMOTE_KEYS {
            assert!(core.get(key).is_none(), "{key} should be removed");
        }
        assert_eq!(core.len(), 2);
    }

    #[test]
    fn unmanaged_entries_and_comments_are_untouched() {
        let rewrite = localize(MANIFEST, &registry(&["core"])).expect("localize");
        assert!(rewrite.text.starts_with("name = \"app\"\nversion = \"0.3.0\"\n"));
        assert!(rewrite.text.contains("# pinned upstream\n[[require]]\nname = \"core\"\n"));
        assert!(rewrite.text.contains(
            "[[require]]\n# not managed here\nname = \"unrelated\"\ngit    = \"https://z\"   # keep spacing\n"
        ));
    }

    #[test]
    fn nothing_managed_leaves_text_identical() {
        let rewrite = localize(MANIFEST, &registry(&["other"])).expect("localize");
        assert!(!rewrite.modified);
        assert!(rewrite.localized.is_empty());
        assert_eq!(rewrite.text, MANIFEST);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let registry = registry(&["core", "unrelated"]);
        let first = localize(MANIFEST, &registry).expect("first pass");
        assert!(first.modified);
        let second = localize(&first.text, &registry).expect("second pass");
        assert!(!second.modified);
        assert_eq!(second.text, first.text);
    }

    #[test]
    fn corrects_a_stale_local_path() {
        let content = "[[require]]\nname = \"core\"\npath = \"vendor/core\" # local\n";
        let rewrite = localize(content, &registry(&["core"])).expect("localize");
        assert!(rewrite.modified);
        assert_eq!(
            rewrite.text,
            "[[require]]\nname = \"core\"\npath = \"../core\" # local\n"
        );
    }

    #[test]
    fn reservoir_scope_and_version_are_removed() {
        let content =
            "[[require]]\nname = \"core\"\nscope = \"org\"\nversion = \"git#v1\"\npath = \"../core\"\n";
        let rewrite = localize(content, &registry(&["core"])).expect("localize");
        assert!(rewrite.modified);
        assert_eq!(rewrite.text, "[[require]]\nname = \"core\"\npath = \"../core\"\n");
    }

    #[test]
    fn entries_without_name_are_skipped() {
        let content = "[[require]]\ngit = \"https://x\"\n";
        let rewrite = localize(content, &registry(&["core"])).expect("localize");
        assert!(!rewrite.modified);
        assert_eq!(rewrite.text, content);
    }

    #[test]
    fn inline_array_requirements_are_rewritten() {
        let content = "name = \"app\"\nrequire = [{ name = \"core\", git = \"https://x\" }, { name = \"zz\", git = \"https://z\" }]\n";
        let rewrite = localize(content, &registry(&["core"])).expect("localize");
        assert!(rewrite.modified);
        let doc: DocumentMut = rewrite.text.parse().expect("reparse");
        let entries = doc["require"].as_array().expect("inline array");
        let core = entries
            .get(0)
            .and_then(Value::as_inline_table)
            .expect("core entry");
        assert_eq!(core.get("path").and_then(Value::as_str), Some("../core"));
        assert!(core.get("git").is_none());
        assert!(rewrite.text.contains("{ name = \"zz\", git = \"https://z\" }"));
    }

    #[test]
    fn invalid_toml_is_reported() {
        assert!(localize("name = ", &registry(&["core"])).is_err());
    }

    #[test]
    fn reads_top_level_name() {
        assert_eq!(package_name(MANIFEST).as_deref(), Some("app"));
        assert_eq!(package_name("version = \"1\"\n"), None);
        assert_eq!(package_name("name = [\n"), None);
    }

    #[test]
    fn classifies_requirement_sources() {
        let content = "[[require]]\nname = \"a\"\ngit = \"https://a\"\nrev = \"main\"\n\n[[require]]\nname = \"b\"\npath = \"../b\"\n\n[[require]]\nname = \"c\"\n\n[[require]]\nscope = \"nameless\"\n";
        let clauses = clauses(content).expect("clauses");
        assert_eq!(clauses.len(), 3);
        assert_eq!(
            clauses[0].source,
            RequirementSource::RemoteGit(RemoteFields {
                git: Some("https://a".to_string()),
                rev: Some("main".to_string()),
                ..RemoteFields::default()
            })
        );
        assert!(clauses[1].is_localized());
        assert_eq!(clauses[2].source, RequirementSource::Unspecified);
    }
}
