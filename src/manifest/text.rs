//! `lakefile.lean` handling.
//!
//! Clause grammar, over the tokens produced by [`lexer`]:
//!
//! ```text
//! clause  := "require" name source?
//! name    := STRING "/" STRING | IDENT
//! source  := "@" "git" STRING
//!          | "@" STRING
//!          | "from" "git" STRING ("@" STRING)?
//!          | "from" STRING
//! package := "package" IDENT "where"
//! ```
//!
//! Localized clauses are printed as `require <name> from "../<name>"`; every
//! byte outside a localized clause is copied through unchanged.
use super::{local_path, RemoteFields, RequirementClause, RequirementSource, Rewrite};
use crate::registry::Registry;
use lexer::{Token, TokenKind};
use regex::Regex;
use std::ops::Range;

mod lexer;

/// A recognized `require` clause and the source bytes it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Recognized {
    clause: RequirementClause,
    span: Range<usize>,
}

pub(super) fn package_name(content: &str) -> Option<String> {
    let tokens = lexer::tokenize(content);
    tokens.windows(3).find_map(|window| match window {
        [package, Token {
            kind: TokenKind::Ident(name),
            ..
        }, tail]
            if package.is_ident("package") && tail.is_ident("where") =>
        {
            Some(name.clone())
        }
        _ => None,
    })
}

pub(super) fn clauses(content: &str) -> Vec<RequirementClause> {
    recognize(&lexer::tokenize(content))
        .into_iter()
        .map(|recognized| recognized.clause)
        .collect()
}

pub(super) fn localize(content: &str, registry: &Registry) -> Rewrite {
    let mut text = String::with_capacity(content.len());
    let mut localized = Vec::new();
    let mut cursor = 0;

    for recognized in recognize(&lexer::tokenize(content)) {
        let name = &recognized.clause.declared_name;
        if !registry.contains(name) {
            continue;
        }
        let original = &content[recognized.span.clone()];
        let printed = print_local_clause(name);
        if printed != original {
            tracing::info!(dependency = %name, path = %local_path(name), "localized requirement");
            localized.push(name.clone());
        }
        text.push_str(&content[cursor..recognized.span.start]);
        text.push_str(&printed);
        cursor = recognized.span.end;
    }
    text.push_str(&content[cursor..]);

    let modified = text != content;
    Rewrite {
        text,
        modified,
        localized,
    }
}

fn print_local_clause(name: &str) -> String {
    format!("require {} from \"{}\"", print_ident(name), local_path(name))
}

fn print_ident(name: &str) -> String {
    let plain = Regex::new(r"^[\p{Alphabetic}_][\p{Alphabetic}\p{N}_'!?]*$")
        .expect("regex for plain identifiers");
    if plain.is_match(name) {
        name.to_string()
    } else {
        format!("«{name}»")
    }
}

fn recognize(tokens: &[Token]) -> Vec<Recognized> {
    let mut found = Vec::new();
    let mut idx = 0;
    while idx < tokens.len() {
        if tokens[idx].is_ident("require") {
            if let Some((recognized, next)) = recognize_clause(tokens, idx) {
                found.push(recognized);
                idx = next;
                continue;
            }
        }
        idx += 1;
    }
    found
}

/// Recognize one clause starting at the `require` token. Returns the clause and
/// the index of the first token after it.
fn recognize_clause(tokens: &[Token], start: usize) -> Option<(Recognized, usize)> {
    let rest = &tokens[start + 1..];
    let (declared_name, scope, name_len) = match rest {
        [Token {
            kind: TokenKind::Str(scope),
            ..
        }, slash, Token {
            kind: TokenKind::Str(name),
            ..
        }, ..]
            if slash.is_punct('/') =>
        {
            (name.clone(), Some(scope.clone()), 3)
        }
        [Token {
            kind: TokenKind::Ident(name),
            ..
        }, ..] => (name.clone(), None, 1),
        _ => return None,
    };

    let after_name = &rest[name_len..];
    let (source, source_len) = match after_name {
        [at, git, Token {
            kind: TokenKind::Str(rev),
            ..
        }, ..]
            if at.is_punct('@') && git.is_ident("git") =>
        {
            let remote = RemoteFields {
                rev: Some(rev.clone()),
                scope: scope.clone(),
                ..RemoteFields::default()
            };
            (RequirementSource::RemoteGit(remote), 3)
        }
        [at, Token {
            kind: TokenKind::Str(version),
            ..
        }, ..]
            if at.is_punct('@') =>
        {
            let remote = RemoteFields {
                version: Some(version.clone()),
                scope: scope.clone(),
                ..RemoteFields::default()
            };
            (RequirementSource::RemoteGit(remote), 2)
        }
        [from, git, Token {
            kind: TokenKind::Str(url),
            ..
        }, tail @ ..]
            if from.is_ident("from") && git.is_ident("git") =>
        {
            let (rev, rev_len) = match tail {
                [at, Token {
                    kind: TokenKind::Str(rev),
                    ..
                }, ..]
                    if at.is_punct('@') =>
                {
                    (Some(rev.clone()), 2)
                }
                _ => (None, 0),
            };
            let remote = RemoteFields {
                git: Some(url.clone()),
                rev,
                scope: scope.clone(),
                ..RemoteFields::default()
            };
            (RequirementSource::RemoteGit(remote), 3 + rev_len)
        }
        [from, Token {
            kind: TokenKind::Str(path),
            ..
        }, ..]
            if from.is_ident("from") =>
        {
            (RequirementSource::LocalPath { path: path.clone() }, 2)
        }
        _ if scope.is_some() => {
            let remote = RemoteFields {
                scope: scope.clone(),
                ..RemoteFields::default()
            };
            (RequirementSource::RemoteGit(remote), 0)
        }
        _ => (RequirementSource::Unspecified, 0),
    };

    let next = start + 1 + name_len + source_len;
    let span = tokens[start].span.start..tokens[next - 1].span.end;
    let recognized = Recognized {
        clause: RequirementClause {
            declared_name,
            source,
        },
        span,
    };
    Some((recognized, next))
}
