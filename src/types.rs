//! Type reconciliation: one display string from a docstring type description
//! or from a resolved annotation plus its bound default.

use crate::model::DefaultValue;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static RE_DEFAULT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"default .+").unwrap());

static RE_DEFAULT_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"default (.+)").unwrap());

static RE_CURLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{.+\}").unwrap());

static RE_CURLY_TRAILING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{.+\},?").unwrap());

static RE_GENERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]+\[.+\]").unwrap());

static RE_GENERIC_TRAILING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]+\[.+\],?").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeParseError {
    #[error("unbalanced `{open}{close}` in type description `{text}`")]
    Unbalanced {
        open: char,
        close: char,
        text: String,
    },
}

/// Render a free-text numpydoc type description.
///
/// Pieces are extracted in a fixed order (default clause, `{...}` group,
/// `Name[...]` group, then comma / ` or ` separated atoms) and emitted in
/// the reverse of that order, so `int, default 5` renders as
/// ``` ``int``, default ``5`` ``` and `int, optional` as
/// ``` ``optional``, ``int`` ```.
pub fn reconcile_free_text(types: &str) -> Result<String, TypeParseError> {
    check_balanced(types, '{', '}')?;
    check_balanced(types, '[', ']')?;

    let mut mangled: Vec<String> = Vec::new();

    if let Some(m) = RE_DEFAULT.find(types) {
        let clause = RE_DEFAULT_VALUE.replace(m.as_str(), "default ``${1}``");
        mangled.push(clause.into_owned());
    }
    let types = RE_DEFAULT.replace_all(types, "");

    let curlied: Vec<String> = RE_CURLY
        .find_iter(&types)
        .map(|m| m.as_str().to_string())
        .collect();
    let no_curls = RE_CURLY_TRAILING.replace_all(&types, "");

    let generics: Vec<String> = RE_GENERIC
        .find_iter(&no_curls)
        .map(|m| m.as_str().to_string())
        .collect();
    let rest = RE_GENERIC_TRAILING.replace_all(&no_curls, "");

    let atoms = rest
        .split(',')
        .map(str::trim)
        .flat_map(|t| t.split(" or "))
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    for typ in atoms.chain(curlied).chain(generics) {
        let parts: Vec<String> = typ.split(" of ").map(|t| format!("``{}``", t)).collect();
        mangled.push(parts.join(" of "));
    }

    mangled.reverse();
    Ok(mangled.join(", "))
}

/// Render a resolved annotation with the default bound in the signature.
pub fn reconcile_annotation(resolved: &str, default: &DefaultValue) -> String {
    match default {
        DefaultValue::Missing => format!("``{}``", resolved),
        DefaultValue::None => format!("``{}``, default `None`", resolved),
        DefaultValue::Value(v) => format!("``{}``, default ``{}``", resolved, v),
    }
}

fn check_balanced(text: &str, open: char, close: char) -> Result<(), TypeParseError> {
    let mut depth: i32 = 0;
    for c in text.chars() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth -= 1;
            if depth < 0 {
                break;
            }
        }
    }
    if depth != 0 {
        return Err(TypeParseError::Unbalanced {
            open,
            close,
            text: text.to_string(),
        });
    }
    Ok(())
}
