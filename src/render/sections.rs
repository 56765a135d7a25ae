//! Section renderers: one pure function per docstring section.
//!
//! Every renderer returns the section's lines, heading included, or nothing
//! at all when the section is absent. Headings sit one level below the
//! entity heading they belong to.

use super::heading;
use crate::anchor;
use crate::model::{Class, EnumDef, Param, ParamKind, Signature};
use crate::parser::annotation::TypeContext;
use crate::parser::numpydoc::{FieldEntry, ParsedDoc};
use crate::types::{reconcile_annotation, reconcile_free_text, TypeParseError};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

static RE_FOOTNOTE_MARK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([0-9]+)\]_").unwrap());

static RE_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([0-9]+)\]\s*(.*)$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
#[error("reference entry without a `[n]` marker: `{0}`")]
pub struct MalformedReference(pub String);

// -- Summary ------------------------------------------------------------------

pub fn summary(doc: &ParsedDoc) -> Vec<String> {
    let mut lines: Vec<String> = [&doc.summary, &doc.extended_summary]
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(|part| footnote_marks(&join_text(part)))
        .collect();
    if !lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

// -- Typed lists --------------------------------------------------------------

pub fn parameters(
    doc: &ParsedDoc,
    signature: Option<&Signature>,
    ctx: &TypeContext<'_>,
    depth: usize,
) -> Vec<String> {
    let annotated: Vec<&Param> = signature
        .map(|sig| {
            sig.params
                .iter()
                .filter(|p| p.annotation.is_some())
                .filter(|p| !matches!(p.name.as_str(), "self" | "cls"))
                .filter(|p| {
                    !matches!(
                        p.kind,
                        ParamKind::PositionalOnlyMarker | ParamKind::KeywordOnlyMarker
                    )
                })
                .collect()
        })
        .unwrap_or_default();
    type_list("Parameters", depth, &annotated, &doc.parameters, ctx)
}

/// Class attributes, with properties moved out of the typed list and
/// appended as links to their own headings.
pub fn attributes(
    doc: &ParsedDoc,
    class: &Class,
    ctx: &TypeContext<'_>,
    depth: usize,
) -> Vec<String> {
    let mut props: Vec<&str> = class
        .properties
        .iter()
        .map(|p| p.name.as_str())
        .filter(|n| !n.starts_with('_'))
        .collect();
    props.sort_unstable();

    let entries: Vec<FieldEntry> = doc
        .attributes
        .iter()
        .filter(|e| !e.split_names().0.iter().any(|n| props.contains(&n.as_str())))
        .cloned()
        .collect();
    let annotated: Vec<&Param> = class
        .annotations
        .iter()
        .filter(|a| !a.name.starts_with('_'))
        .collect();

    let mut lines = type_list("Attributes", depth, &annotated, &entries, ctx);
    if props.is_empty() {
        return lines;
    }
    if lines.is_empty() {
        lines = vec![heading(depth + 1, "Attributes"), String::new()];
    }
    for prop in props {
        lines.push(format!("- {}", anchor::heading_link(prop)));
        lines.push(String::new());
    }
    lines
}

fn type_list(
    title: &str,
    depth: usize,
    annotated: &[&Param],
    entries: &[FieldEntry],
    ctx: &TypeContext<'_>,
) -> Vec<String> {
    if annotated.is_empty() && entries.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![heading(depth + 1, title), String::new()];
    let mut documented: Vec<String> = Vec::new();

    for entry in entries {
        let (names, types) = entry.split_names();
        let mut untyped = Vec::new();

        for name in &names {
            let bare = name.trim_start_matches('*');
            documented.push(bare.to_string());
            match annotated.iter().find(|p| p.name == bare) {
                Some(param) => {
                    lines.push(format!("- `{}`: {}", name, annotated_type(param, ctx)));
                    lines.push(String::new());
                }
                None => untyped.push(format!("`{}`", name)),
            }
        }

        if !untyped.is_empty() {
            let mut bullet = format!("- {}", untyped.join(", "));
            if !types.is_empty() {
                match reconcile_free_text(&types) {
                    Ok(rendered) => {
                        bullet.push_str(": ");
                        bullet.push_str(&rendered);
                    }
                    Err(e) => warn!(section = title, names = %entry.names, "{e}, type omitted"),
                }
            }
            lines.push(bullet);
            lines.push(String::new());
        }

        if !entry.description.is_empty() {
            lines.push(format!("    {}", join_text(&entry.description)));
            lines.push(String::new());
        }
    }

    for param in annotated {
        if !documented.contains(&param.name) {
            lines.push(format!("- `{}`: {}", param.name, annotated_type(param, ctx)));
            lines.push(String::new());
        }
    }
    lines
}

fn annotated_type(param: &Param, ctx: &TypeContext<'_>) -> String {
    let resolved = ctx.resolve(param.annotation.as_deref().unwrap_or_default());
    reconcile_annotation(&resolved, &param.default)
}

// -- Returns ------------------------------------------------------------------

/// The return annotation wins over docstring types; docstring entries only
/// contribute a name and description next to it.
pub fn returns(
    doc: &ParsedDoc,
    signature: Option<&Signature>,
    ctx: &TypeContext<'_>,
    depth: usize,
) -> Result<Vec<String>, TypeParseError> {
    let annotation = signature
        .and_then(|s| s.returns.as_deref())
        .map(|r| ctx.resolve(r));
    if doc.returns.is_empty() && annotation.is_none() {
        return Ok(Vec::new());
    }
    let mut lines = vec![heading(depth + 1, "Returns"), String::new()];

    if let Some(ret) = annotation {
        match doc.returns.as_slice() {
            [entry] => {
                if entry.types.is_empty() {
                    lines.push(format!("- ``{}``", ret));
                } else {
                    lines.push(format!("- `{}`: ``{}``", entry.names, ret));
                }
                lines.push(String::new());
                push_description(&mut lines, entry);
            }
            _ => {
                lines.push(format!("- ``{}``", ret));
                lines.push(String::new());
            }
        }
        return Ok(lines);
    }

    for entry in &doc.returns {
        let (name, typ) = match (entry.types.is_empty(), entry.names.split_once(':')) {
            (true, Some((n, t))) => (n.trim(), t.trim()),
            _ => (entry.names.trim(), entry.types.trim()),
        };
        if typ.is_empty() {
            lines.push(format!("- {}", reconcile_free_text(name)?));
        } else {
            lines.push(format!("- `{}`: {}", name, reconcile_free_text(typ)?));
        }
        lines.push(String::new());
        push_description(&mut lines, entry);
    }
    Ok(lines)
}

fn push_description(lines: &mut Vec<String>, entry: &FieldEntry) {
    if !entry.description.is_empty() {
        lines.push(format!("    {}", join_text(&entry.description)));
        lines.push(String::new());
    }
}

// -- Enum members -------------------------------------------------------------

pub fn members(def: &EnumDef, depth: usize) -> Vec<String> {
    if def.members.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![heading(depth + 1, "Members"), String::new()];
    for (name, value) in &def.members {
        lines.push(format!("- `{}`: ``{}``", name, value));
        lines.push(String::new());
    }
    lines
}

// -- Free text ----------------------------------------------------------------

/// Doctest lines become fenced python blocks; a blank line closes a block.
pub fn examples(doc: &ParsedDoc, depth: usize) -> Vec<String> {
    if doc.examples.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![heading(depth + 1, "Examples"), String::new()];
    let mut in_code = false;

    for line in &doc.examples {
        let was_code = in_code;
        if line.starts_with(">>>") {
            in_code = true;
        } else if line.trim().is_empty() {
            in_code = false;
        }

        match (was_code, in_code) {
            (true, false) => {
                lines.push("```".to_string());
                lines.push(String::new());
            }
            (false, false) => lines.push(format!("{} ", line)),
            (false, true) => {
                lines.push("```python".to_string());
                lines.push(strip_prompt(line).to_string());
            }
            (true, true) => lines.push(strip_prompt(line).to_string()),
        }
    }
    if in_code {
        lines.push("```".to_string());
    }
    lines.push(String::new());
    lines
}

fn strip_prompt(line: &str) -> &str {
    line.strip_prefix(">>> ").unwrap_or(line)
}

pub fn notes(doc: &ParsedDoc) -> Vec<String> {
    admonition("note", &doc.notes)
}

pub fn warnings(doc: &ParsedDoc) -> Vec<String> {
    admonition("warning", &doc.warnings)
}

fn admonition(kind: &str, text: &[String]) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    vec![
        format!("!!! {}", kind),
        format!("    {}", join_text(text)),
        String::new(),
    ]
}

/// `[n] body` entries become footnote definitions. Continuation lines are
/// indented and fold into the entry above them.
pub fn references(doc: &ParsedDoc) -> Result<Vec<String>, MalformedReference> {
    let mut entries: Vec<String> = Vec::new();
    for line in &doc.references {
        if line.trim().is_empty() {
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            if let Some(last) = entries.last_mut() {
                last.push(' ');
                last.push_str(line.trim());
                continue;
            }
        }
        entries.push(line.trim().to_string());
    }

    let mut lines = Vec::new();
    for entry in entries {
        let body = entry.strip_prefix("..").map(str::trim_start).unwrap_or(&entry);
        let caps = RE_REFERENCE
            .captures(body)
            .ok_or_else(|| MalformedReference(entry.clone()))?;
        lines.push(format!("[^{}]: {}", &caps[1], &caps[2]));
        lines.push(String::new());
    }
    Ok(lines)
}

fn footnote_marks(text: &str) -> String {
    RE_FOOTNOTE_MARK.replace_all(text, "[^${1}]").into_owned()
}

fn join_text(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
