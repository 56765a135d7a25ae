//! Python source extractor: logical-line scanner plus member extraction.
//!
//! Recovers what runtime introspection would report for a module without
//! importing it: the module docstring, imports, top-level functions and
//! classes, each class's methods, properties, class-level annotations and
//! `__init__` signature, and enum members.
//!
//! Only top-level `def`/`class` statements are documented; definitions
//! nested inside `if`/`try` blocks are not inspected, but imports anywhere
//! outside function and class bodies are.

use crate::model::*;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

static RE_DEF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:async\s+)?def\s+([A-Za-z_]\w*)\s*[\[(]").unwrap());

static RE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^class\s+([A-Za-z_]\w*)\s*").unwrap());

static RE_FROM_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^from\s+(\.*)([\w.]*)\s+import\s+(.+)$").unwrap());

static RE_ANNOTATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*:\s*(.+)$").unwrap());

static RE_ASSIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*=([^=].*)$").unwrap());

static RE_FIELD_DEFAULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:dataclasses\.)?field\((.*)\)$").unwrap());

/// Base classes that turn a class into an enum.
const ENUM_BASES: &[&str] = &["Enum", "IntEnum", "StrEnum", "Flag", "IntFlag"];

/// Statement keywords that can look like `name: value` annotations.
const KEYWORDS: &[&str] = &[
    "else", "try", "finally", "except", "lambda", "if", "elif", "while", "for", "with", "return",
    "match", "case",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: usize },
    #[error("line {line}: unbalanced `{bracket}`")]
    UnbalancedBracket { line: usize, bracket: char },
}

/// One logical line: continuation lines joined, comments dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogicalLine {
    /// 1-based physical line the statement starts on
    line: usize,
    indent: usize,
    text: String,
}

// -- Public API ---------------------------------------------------------------

/// Extract a module's documentable members from its source.
pub fn parse_module(name: &str, file: &Path, source: &str) -> Result<Module, SourceError> {
    let lines = logical_lines(source)?;
    let mut module = Module {
        name: name.to_string(),
        file: file.to_path_buf(),
        is_package: file.file_stem().is_some_and(|s| s == "__init__"),
        ..Default::default()
    };

    module.docstring = lines
        .first()
        .filter(|l| l.indent == 0)
        .and_then(|l| string_literal_value(&l.text))
        .map(|d| cleandoc(&d));

    let mut decorators: Vec<(usize, String)> = Vec::new();
    let mut inherits: Vec<(usize, Vec<String>)> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];

        if let Some(imports) = parse_import(&line.text, module.package()) {
            module.imports.extend(imports);
            decorators.clear();
            i += 1;
            continue;
        }
        if line.indent != 0 {
            i += 1;
            continue;
        }
        if let Some(dec) = line.text.strip_prefix('@') {
            decorators.push((line.line, dec.trim().to_string()));
            i += 1;
            continue;
        }

        let end = block_end(&lines, i);
        if RE_DEF.is_match(&line.text) {
            if let Some(func) = parse_function(&lines, i, end, std::mem::take(&mut decorators)) {
                upsert(&mut module.functions, func, |f| &f.name);
            }
            i = end;
            continue;
        }
        if RE_CLASS.is_match(&line.text) {
            match parse_class(&lines, i, end, std::mem::take(&mut decorators)) {
                Some(Extracted::Class { class, needs_init }) => {
                    if needs_init {
                        inherits.push((module.classes.len(), class.bases.clone()));
                    }
                    module.classes.push(class);
                }
                Some(Extracted::Enum(def)) => module.enums.push(def),
                None => debug!(module = name, line = line.line, "unparsable class header"),
            }
            i = end;
            continue;
        }

        decorators.clear();
        i += 1;
    }

    inherit_inits(&mut module.classes, &inherits);
    Ok(module)
}

// -- Logical lines ------------------------------------------------------------

fn logical_lines(source: &str) -> Result<Vec<LogicalLine>, SourceError> {
    // CRLF sources scan like LF ones, backslash continuations included
    let chars: Vec<char> = source.replace("\r\n", "\n").chars().collect();
    let mut out = Vec::new();
    let mut text = String::new();
    let mut brackets: Vec<(char, usize)> = Vec::new();
    let mut line = 1;
    let mut start = 1;
    let mut indent = 0;
    let mut at_start = true;
    let mut i = 0;

    while i < chars.len() {
        if at_start {
            let mut col = 0;
            while i < chars.len() && matches!(chars[i], ' ' | '\t' | '\x0c') {
                col = if chars[i] == '\t' { (col / 8 + 1) * 8 } else { col + 1 };
                i += 1;
            }
            match chars.get(i) {
                None => break,
                Some('\n') => {
                    line += 1;
                    i += 1;
                    continue;
                }
                Some('\r') => {
                    i += 1;
                    continue;
                }
                Some('#') => {
                    while i < chars.len() && chars[i] != '\n' {
                        i += 1;
                    }
                    continue;
                }
                Some(_) => {
                    indent = col;
                    start = line;
                    at_start = false;
                }
            }
        }

        let c = chars[i];
        match c {
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '\'' | '"' => i = scan_string(&chars, i, &mut line, &mut text)?,
            '(' | '[' | '{' => {
                brackets.push((c, line));
                text.push(c);
                i += 1;
            }
            ')' | ']' | '}' => {
                let open = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match brackets.pop() {
                    Some((o, _)) if o == open => {}
                    _ => return Err(SourceError::UnbalancedBracket { line, bracket: c }),
                }
                if text.ends_with(' ') {
                    text.pop();
                }
                text.push(c);
                i += 1;
            }
            '\\' if chars.get(i + 1) == Some(&'\n') => {
                line += 1;
                i += 2;
                push_space(&mut text);
            }
            '\n' => {
                line += 1;
                i += 1;
                if brackets.is_empty() {
                    flush(&mut out, &mut text, start, indent);
                    at_start = true;
                } else {
                    push_space(&mut text);
                }
            }
            ' ' | '\t' | '\r' | '\x0c' => {
                push_space(&mut text);
                i += 1;
            }
            _ => {
                text.push(c);
                i += 1;
            }
        }
    }

    if let Some((bracket, line)) = brackets.pop() {
        return Err(SourceError::UnbalancedBracket { line, bracket });
    }
    flush(&mut out, &mut text, start, indent);
    Ok(out)
}

/// Copy a string literal starting at `i` into `text`, returning the index
/// just past its closing quote.
fn scan_string(
    chars: &[char],
    i: usize,
    line: &mut usize,
    text: &mut String,
) -> Result<usize, SourceError> {
    let quote = chars[i];
    let triple = chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote);
    let start_line = *line;
    let delim = if triple { 3 } else { 1 };
    for _ in 0..delim {
        text.push(quote);
    }
    let mut j = i + delim;

    loop {
        let Some(&c) = chars.get(j) else {
            return Err(SourceError::UnterminatedString { line: start_line });
        };
        match c {
            '\\' => {
                text.push(c);
                let Some(&next) = chars.get(j + 1) else {
                    return Err(SourceError::UnterminatedString { line: start_line });
                };
                if next == '\n' {
                    *line += 1;
                }
                text.push(next);
                j += 2;
                continue;
            }
            '\n' if !triple => return Err(SourceError::UnterminatedString { line: start_line }),
            '\n' => *line += 1,
            _ if c == quote && !triple => {
                text.push(c);
                return Ok(j + 1);
            }
            _ if c == quote
                && chars.get(j + 1) == Some(&quote)
                && chars.get(j + 2) == Some(&quote) =>
            {
                for _ in 0..3 {
                    text.push(quote);
                }
                return Ok(j + 3);
            }
            _ => {}
        }
        text.push(c);
        j += 1;
    }
}

fn push_space(text: &mut String) {
    if !text.is_empty() && !text.ends_with(|c: char| matches!(c, ' ' | '(' | '[' | '{')) {
        text.push(' ');
    }
}

fn flush(out: &mut Vec<LogicalLine>, text: &mut String, line: usize, indent: usize) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(LogicalLine {
            line,
            indent,
            text: trimmed.to_string(),
        });
    }
    text.clear();
}

fn block_end(lines: &[LogicalLine], header: usize) -> usize {
    let indent = lines[header].indent;
    let mut j = header + 1;
    while j < lines.len() && lines[j].indent > indent {
        j += 1;
    }
    j
}

// -- String literals ----------------------------------------------------------

/// The value of `text` when it is exactly one (non-bytes, non-f) string literal.
fn string_literal_value(text: &str) -> Option<String> {
    let t = text.trim();
    let prefix_len = t.find(['\'', '"'])?;
    let prefix = t[..prefix_len].to_ascii_lowercase();
    if !matches!(prefix.as_str(), "" | "r" | "u") {
        return None;
    }
    let body = &t[prefix_len..];
    let quote = body.chars().next()?;
    let triple_delim: String = std::iter::repeat(quote).take(3).collect();
    let delim = if body.len() >= 6 && body.starts_with(&triple_delim) {
        triple_delim
    } else {
        quote.to_string()
    };
    if body.len() < delim.len() * 2 || !body.ends_with(&delim) {
        return None;
    }
    let inner = &body[delim.len()..body.len() - delim.len()];
    if contains_unescaped(inner, &delim) {
        return None;
    }
    Some(if prefix == "r" {
        inner.to_string()
    } else {
        unescape(inner)
    })
}

fn contains_unescaped(inner: &str, delim: &str) -> bool {
    let mut escaped = false;
    for (idx, c) in inner.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if inner[idx..].starts_with(delim) {
            return true;
        }
    }
    false
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('\n') => {}
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Clean a docstring the way runtime `getdoc` does: strip the first line,
/// remove the common indentation of the rest, drop surrounding blank lines.
fn cleandoc(doc: &str) -> String {
    let lines: Vec<String> = doc.split('\n').map(expand_tabs).collect();
    let margin = lines
        .iter()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(idx, l)| {
            if idx == 0 {
                l.trim_start().to_string()
            } else {
                l.get(margin..).unwrap_or("").trim_end().to_string()
            }
        })
        .collect();

    while cleaned.last().is_some_and(|l| l.is_empty()) {
        cleaned.pop();
    }
    let leading = cleaned.iter().take_while(|l| l.is_empty()).count();
    cleaned.drain(..leading);
    cleaned.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - out.chars().count() % 8;
            out.extend(std::iter::repeat(' ').take(pad));
        } else {
            out.push(c);
        }
    }
    out
}

// -- Top-level scanning helpers -----------------------------------------------

/// Characters outside string literals, each with its bracket depth.
fn top_level_chars(text: &str) -> Vec<(usize, char, i32)> {
    let mut out = Vec::new();
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => {
                out.push((idx, c, depth));
                depth += 1;
            }
            ')' | ']' | '}' => {
                depth -= 1;
                out.push((idx, c, depth));
            }
            _ => out.push((idx, c, depth)),
        }
    }
    out
}

fn matching_close(text: &str, open: usize) -> Option<usize> {
    let chars = top_level_chars(text);
    let (_, _, depth) = *chars.iter().find(|(idx, _, _)| *idx == open)?;
    chars
        .iter()
        .find(|(idx, c, d)| *idx > open && *d == depth && matches!(c, ')' | ']' | '}'))
        .map(|(idx, _, _)| *idx)
}

fn find_top_level(text: &str, target: char) -> Option<usize> {
    top_level_chars(text)
        .into_iter()
        .find(|(_, c, d)| *c == target && *d == 0)
        .map(|(idx, _, _)| idx)
}

fn split_top_level(text: &str, sep: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut last = 0;
    for (idx, c, depth) in top_level_chars(text) {
        if c == sep && depth == 0 {
            parts.push(text[last..idx].trim().to_string());
            last = idx + c.len_utf8();
        }
    }
    parts.push(text[last..].trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Index of the first top-level `=` that is an assignment, not a comparison.
fn find_assign_eq(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    top_level_chars(text)
        .into_iter()
        .filter(|(_, c, d)| *c == '=' && *d == 0)
        .map(|(idx, _, _)| idx)
        .find(|&idx| {
            let prev = idx.checked_sub(1).map(|p| bytes[p]);
            let next = bytes.get(idx + 1).copied();
            !matches!(prev, Some(b'=' | b'!' | b'<' | b'>' | b':')) && next != Some(b'=')
        })
}

// -- Statements ---------------------------------------------------------------

fn parse_import(text: &str, package: &str) -> Option<Vec<Import>> {
    if let Some(rest) = text.strip_prefix("import ") {
        let imports = rest
            .split(',')
            .filter_map(|part| {
                let part = part.trim();
                match part.split_once(" as ") {
                    Some((target, alias)) => Some(Import {
                        alias: alias.trim().to_string(),
                        target: target.trim().to_string(),
                    }),
                    None => {
                        let root = part.split('.').next().filter(|r| !r.is_empty())?;
                        Some(Import {
                            alias: root.to_string(),
                            target: root.to_string(),
                        })
                    }
                }
            })
            .collect();
        return Some(imports);
    }

    let caps = RE_FROM_IMPORT.captures(text)?;
    let dots = caps[1].len();
    let from = &caps[2];
    let base = if dots == 0 {
        from.to_string()
    } else {
        let mut parts: Vec<&str> = package.split('.').filter(|p| !p.is_empty()).collect();
        for _ in 1..dots {
            parts.pop();
        }
        if !from.is_empty() {
            parts.push(from);
        }
        parts.join(".")
    };
    let names = caps[3].trim().trim_start_matches('(').trim_end_matches(')');

    let imports = names
        .split(',')
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "*")
        .map(|n| {
            let (name, alias) = n.split_once(" as ").unwrap_or((n, n));
            let target = if base.is_empty() {
                name.trim().to_string()
            } else {
                format!("{}.{}", base, name.trim())
            };
            Import {
                alias: alias.trim().to_string(),
                target,
            }
        })
        .collect();
    Some(imports)
}

/// `def name[T](params) -> ret: inline` → (name, signature, inline body);
/// a type-parameter list is skipped.
fn parse_def(text: &str) -> Option<(String, Signature, String)> {
    let caps = RE_DEF.captures(text)?;
    let name = caps[1].to_string();
    let mut open = caps.get(0)?.end() - 1;
    if text[open..].starts_with('[') {
        let after = matching_close(text, open)? + 1;
        open = after + text[after..].find('(')?;
        if !text[after..open].trim().is_empty() {
            return None;
        }
    }
    let close = matching_close(text, open)?;
    let params = parse_params(&text[open + 1..close]);

    let rest = &text[close + 1..];
    let colon = find_top_level(rest, ':')?;
    let returns = rest[..colon]
        .trim()
        .strip_prefix("->")
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty());
    let inline = rest[colon + 1..].trim().to_string();

    Some((name, Signature { params, returns }, inline))
}

fn parse_params(text: &str) -> Vec<Param> {
    let mut params = Vec::new();
    let mut keyword_only = false;

    for part in split_top_level(text, ',') {
        let (head, default) = match find_assign_eq(&part) {
            Some(idx) => (
                part[..idx].trim(),
                DefaultValue::from_source(&part[idx + 1..]),
            ),
            None => (part.as_str(), DefaultValue::Missing),
        };
        let (name, annotation) = match find_top_level(head, ':') {
            Some(idx) => (head[..idx].trim(), Some(head[idx + 1..].trim().to_string())),
            None => (head.trim(), None),
        };

        let (name, kind) = if name == "/" {
            (name, ParamKind::PositionalOnlyMarker)
        } else if name == "*" {
            keyword_only = true;
            (name, ParamKind::KeywordOnlyMarker)
        } else if let Some(n) = name.strip_prefix("**") {
            (n, ParamKind::VarKeyword)
        } else if let Some(n) = name.strip_prefix('*') {
            keyword_only = true;
            (n, ParamKind::VarPositional)
        } else if keyword_only {
            (name, ParamKind::KeywordOnly)
        } else {
            (name, ParamKind::Positional)
        };

        params.push(Param {
            name: name.to_string(),
            kind,
            annotation,
            default,
        });
    }
    params
}

fn parse_function(
    lines: &[LogicalLine],
    header: usize,
    end: usize,
    decorators: Vec<(usize, String)>,
) -> Option<Function> {
    let Some((name, signature, inline)) = parse_def(&lines[header].text) else {
        debug!(line = lines[header].line, "unparsable def header");
        return None;
    };
    let docstring = if inline.is_empty() {
        docstring_at(lines, header + 1, end)
    } else {
        string_literal_value(&inline).map(|d| cleandoc(&d))
    };
    Some(Function {
        name,
        line: decorators.first().map_or(lines[header].line, |d| d.0),
        docstring,
        signature,
        decorators: decorators.into_iter().map(|d| d.1).collect(),
    })
}

fn docstring_at(lines: &[LogicalLine], idx: usize, end: usize) -> Option<String> {
    if idx >= end {
        return None;
    }
    string_literal_value(&lines[idx].text).map(|d| cleandoc(&d))
}

enum Extracted {
    Class { class: Class, needs_init: bool },
    Enum(EnumDef),
}

/// `class Name(bases): inline` → (name, bases, inline body).
fn parse_class_header(text: &str) -> Option<(String, Vec<String>, String)> {
    let caps = RE_CLASS.captures(text)?;
    let name = caps[1].to_string();
    let mut rest = &text[caps.get(0)?.end()..];

    if rest.starts_with('[') {
        let close = matching_close(rest, 0)?;
        rest = rest[close + 1..].trim_start();
    }
    let mut bases = Vec::new();
    if rest.starts_with('(') {
        let close = matching_close(rest, 0)?;
        bases = split_top_level(&rest[1..close], ',')
            .into_iter()
            .filter(|b| find_assign_eq(b).is_none())
            .collect();
        rest = &rest[close + 1..];
    }
    let colon = find_top_level(rest, ':')?;
    Some((name, bases, rest[colon + 1..].trim().to_string()))
}

fn parse_class(
    lines: &[LogicalLine],
    header: usize,
    end: usize,
    decorators: Vec<(usize, String)>,
) -> Option<Extracted> {
    let (name, bases, inline) = parse_class_header(&lines[header].text)?;
    let line = decorators.first().map_or(lines[header].line, |d| d.0);
    let docstring = if inline.is_empty() {
        docstring_at(lines, header + 1, end)
    } else {
        string_literal_value(&inline).map(|d| cleandoc(&d))
    };
    let is_enum = bases
        .iter()
        .any(|b| ENUM_BASES.contains(&decorator_name(b)));
    let decorators: Vec<String> = decorators.into_iter().map(|d| d.1).collect();

    let mut class = Class {
        name,
        line,
        docstring,
        bases,
        decorators,
        ..Default::default()
    };
    let mut members: Vec<(String, String)> = Vec::new();
    let mut own_init: Option<Signature> = None;
    let mut pending: Vec<(usize, String)> = Vec::new();
    let body_indent = (header + 1 < end).then(|| lines[header + 1].indent);

    let mut j = header + 1;
    while j < end {
        let l = &lines[j];
        if Some(l.indent) != body_indent {
            j += 1;
            continue;
        }
        if let Some(dec) = l.text.strip_prefix('@') {
            pending.push((l.line, dec.trim().to_string()));
            j += 1;
            continue;
        }
        let member_end = block_end(lines, j);

        if RE_DEF.is_match(&l.text) {
            if let Some(func) = parse_function(lines, j, member_end, std::mem::take(&mut pending)) {
                add_method(&mut class, &mut own_init, func);
            }
            j = member_end;
            continue;
        }
        pending.clear();

        if let Some(caps) = RE_ANNOTATED.captures(&l.text) {
            let attr = &caps[1];
            if !KEYWORDS.contains(&attr) {
                class.annotations.push(parse_annotated(attr, &caps[2]));
            }
        } else if let Some(caps) = RE_ASSIGN.captures(&l.text) {
            let member = &caps[1];
            if is_enum && !member.starts_with('_') {
                members.push((member.to_string(), caps[2].trim().to_string()));
            }
        }
        j = member_end;
    }

    if is_enum {
        return Some(Extracted::Enum(EnumDef {
            name: class.name,
            line: class.line,
            docstring: class.docstring,
            members,
        }));
    }

    let mut needs_init = false;
    match own_init {
        Some(init) => class.init = init,
        None if class.decorators.iter().any(|d| decorator_name(d) == "dataclass") => {
            class.init = dataclass_init(&class.annotations);
        }
        None => needs_init = true,
    }
    Some(Extracted::Class { class, needs_init })
}

fn parse_annotated(name: &str, rest: &str) -> Param {
    let (annotation, default) = match find_assign_eq(rest) {
        Some(idx) => (rest[..idx].trim(), DefaultValue::from_source(&rest[idx + 1..])),
        None => (rest.trim(), DefaultValue::Missing),
    };
    Param {
        name: name.to_string(),
        kind: ParamKind::Positional,
        annotation: Some(annotation.to_string()),
        default,
    }
}

fn add_method(class: &mut Class, own_init: &mut Option<Signature>, mut func: Function) {
    let decorators: Vec<&str> = func.decorators.iter().map(|d| decorator_name(d)).collect();

    if func.name == "__init__" {
        // calling the class reports no return annotation
        *own_init = Some(Signature {
            returns: None,
            ..without_first_param(&func.signature)
        });
        return;
    }
    if decorators
        .iter()
        .any(|d| matches!(*d, "overload" | "setter" | "deleter"))
    {
        return;
    }
    if decorators
        .iter()
        .any(|d| matches!(*d, "property" | "cached_property"))
    {
        upsert(&mut class.properties, func, |f| &f.name);
        return;
    }
    if decorators.contains(&"classmethod") {
        func.signature = without_first_param(&func.signature);
    }
    upsert(&mut class.methods, func, |f| &f.name);
}

/// Last dotted segment of a decorator or base, without call arguments.
fn decorator_name(text: &str) -> &str {
    let head = text.split(['(', '[']).next().unwrap_or(text).trim();
    head.rsplit('.').next().unwrap_or(head)
}

fn without_first_param(sig: &Signature) -> Signature {
    let mut params = sig.params.clone();
    if params.first().is_some_and(|p| p.kind == ParamKind::Positional) {
        params.remove(0);
    }
    Signature {
        params,
        returns: sig.returns.clone(),
    }
}

/// Synthesize a dataclass `__init__` from its annotated fields.
fn dataclass_init(annotations: &[Param]) -> Signature {
    let params = annotations
        .iter()
        .filter(|a| {
            a.annotation
                .as_deref()
                .is_some_and(|t| decorator_name(t) != "ClassVar")
        })
        .map(|a| {
            let default = match &a.default {
                DefaultValue::Value(v) => field_default(v),
                other => other.clone(),
            };
            Param {
                default,
                ..a.clone()
            }
        })
        .collect();
    Signature {
        params,
        returns: None,
    }
}

fn field_default(value: &str) -> DefaultValue {
    let Some(caps) = RE_FIELD_DEFAULT.captures(value) else {
        return DefaultValue::from_source(value);
    };
    for arg in split_top_level(&caps[1], ',') {
        if let Some((key, v)) = arg.split_once('=') {
            match key.trim() {
                "default" => return DefaultValue::from_source(v),
                "default_factory" => return DefaultValue::Value("<factory>".to_string()),
                _ => {}
            }
        }
    }
    DefaultValue::Missing
}

/// Classes without their own `__init__` take the signature of the first
/// base defined earlier in the same module.
fn inherit_inits(classes: &mut [Class], pending: &[(usize, Vec<String>)]) {
    for (idx, bases) in pending {
        let inherited = bases.iter().find_map(|base| {
            let base = decorator_name(base);
            classes[..*idx]
                .iter()
                .find(|c| c.name == base)
                .map(|c| c.init.clone())
        });
        if let Some(init) = inherited {
            classes[*idx].init = init;
        }
    }
}

/// Later definitions replace earlier ones with the same name.
fn upsert<T>(items: &mut Vec<T>, item: T, key: impl Fn(&T) -> &String) {
    match items.iter().position(|i| key(i) == key(&item)) {
        Some(pos) => items[pos] = item,
        None => items.push(item),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(source: &str) -> Module {
        parse_module("pkg.mod", &PathBuf::from("pkg/mod.py"), source).unwrap()
    }

    #[test]
    fn joins_bracketed_continuation_lines() {
        let lines = logical_lines("def f(\n    a,\n    b,\n):\n    pass\n").unwrap();
        assert_eq!(lines[0].text, "def f(a, b,):");
        assert_eq!(lines[0].line, 1);
        assert_eq!(lines[1].line, 5);
        assert_eq!(lines[1].indent, 4);
    }

    #[test]
    fn crlf_backslash_continuations_are_joined() {
        let lines = logical_lines("total = 1 + \\\r\n    2\r\ndef f(a, \\\r\n      b):\r\n    pass\r\n").unwrap();
        assert_eq!(lines[0].text, "total = 1 + 2");
        assert_eq!(lines[1].text, "def f(a, b):");
        assert_eq!(lines[1].line, 3);
        assert_eq!(lines[2].line, 5);
    }

    #[test]
    fn generic_function_is_extracted() {
        let m = parse("def first[T](items: list[T]) -> T:\n    \"\"\"First item.\"\"\"\n    return items[0]\n");
        let f = &m.functions[0];
        assert_eq!(f.name, "first");
        assert_eq!(f.docstring.as_deref(), Some("First item."));
        assert_eq!(f.signature.params[0].name, "items");
        assert_eq!(f.signature.params[0].annotation.as_deref(), Some("list[T]"));
        assert_eq!(f.signature.returns.as_deref(), Some("T"));
    }

    #[test]
    fn comments_are_dropped() {
        let lines = logical_lines("x = 1  # note\n# whole line\ny = '#not'\n").unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "x = 1");
        assert_eq!(lines[1].text, "y = '#not'");
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            logical_lines("x = 'abc\n").unwrap_err(),
            SourceError::UnterminatedString { line: 1 }
        );
    }

    #[test]
    fn unbalanced_bracket_is_an_error() {
        assert!(matches!(
            logical_lines("x = (1,\n").unwrap_err(),
            SourceError::UnbalancedBracket { bracket: '(', .. }
        ));
    }

    #[test]
    fn module_docstring_is_cleaned() {
        let m = parse("\"\"\"\n    Title.\n\n    Body.\n    \"\"\"\nimport os\n");
        assert_eq!(m.docstring.as_deref(), Some("Title.\n\nBody."));
    }

    #[test]
    fn function_signature_and_docstring() {
        let m = parse(
            "def add(a: int, b: int = 2, *args, c=None, **kw) -> int:\n    \"\"\"Add things.\"\"\"\n    return a\n",
        );
        let f = &m.functions[0];
        assert_eq!(f.name, "add");
        assert_eq!(f.line, 1);
        assert_eq!(f.docstring.as_deref(), Some("Add things."));
        assert_eq!(f.signature.returns.as_deref(), Some("int"));
        let p = &f.signature.params;
        assert_eq!(p.len(), 5);
        assert_eq!(p[0].annotation.as_deref(), Some("int"));
        assert_eq!(p[1].default, DefaultValue::Value("2".into()));
        assert_eq!(p[2].kind, ParamKind::VarPositional);
        assert_eq!(p[3].kind, ParamKind::KeywordOnly);
        assert_eq!(p[3].default, DefaultValue::None);
        assert_eq!(p[4].kind, ParamKind::VarKeyword);
        assert_eq!(p[4].name, "kw");
    }

    #[test]
    fn decorated_function_reports_decorator_line() {
        let m = parse("import functools\n\n@functools.lru_cache()\ndef cached():\n    pass\n");
        assert_eq!(m.functions[0].line, 3);
    }

    #[test]
    fn class_members_are_classified() {
        let src = "\
class Thing(Base):
    \"\"\"A thing.\"\"\"

    size: int = 3

    def __init__(self, size: int = 3):
        self.size = size

    @property
    def area(self) -> float:
        return 1.0

    @area.setter
    def area(self, value):
        pass

    @classmethod
    def build(cls, n):
        pass

    def _hidden(self):
        pass
";
        let m = parse(src);
        let c = &m.classes[0];
        assert_eq!(c.name, "Thing");
        assert_eq!(c.bases, vec!["Base"]);
        assert_eq!(c.init.params.len(), 1);
        assert_eq!(c.init.params[0].name, "size");
        assert_eq!(c.annotations[0].name, "size");
        assert_eq!(c.properties.len(), 1);
        assert_eq!(c.properties[0].signature.returns.as_deref(), Some("float"));
        let names: Vec<&str> = c.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["build", "_hidden"]);
        assert_eq!(c.methods[0].signature.params[0].name, "n");
    }

    #[test]
    fn enum_classes_become_enums() {
        let m = parse("from enum import Enum\n\nclass Color(Enum):\n    \"\"\"Colours.\"\"\"\n    RED = 1\n    GREEN = 'g'\n    _private = 3\n");
        assert!(m.classes.is_empty());
        let e = &m.enums[0];
        assert_eq!(e.name, "Color");
        assert_eq!(
            e.members,
            vec![("RED".to_string(), "1".to_string()), ("GREEN".to_string(), "'g'".to_string())]
        );
    }

    #[test]
    fn dataclass_init_is_synthesized() {
        let src = "\
from dataclasses import dataclass, field

@dataclass
class Point:
    x: int
    y: int = 0
    tags: list = field(default_factory=list)
";
        let m = parse(src);
        let init = &m.classes[0].init;
        assert_eq!(init.params.len(), 3);
        assert_eq!(init.params[1].default, DefaultValue::Value("0".into()));
        assert_eq!(init.params[2].default, DefaultValue::Value("<factory>".into()));
        assert_eq!(m.classes[0].line, 3);
    }

    #[test]
    fn subclass_inherits_local_base_init() {
        let m = parse("class A:\n    def __init__(self, x):\n        pass\n\nclass B(A):\n    pass\n");
        assert_eq!(m.classes[1].init.params[0].name, "x");
    }

    #[test]
    fn relative_imports_resolve_against_package() {
        let m = parse("from . import sibling\nfrom .other import Thing as T\nfrom ..up import x\nimport numpy as np, os.path\n");
        let targets: Vec<(&str, &str)> = m
            .imports
            .iter()
            .map(|i| (i.alias.as_str(), i.target.as_str()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("sibling", "pkg.sibling"),
                ("T", "pkg.other.Thing"),
                ("x", "up.x"),
                ("np", "numpy"),
                ("os", "os"),
            ]
        );
    }

    #[test]
    fn nested_definitions_are_not_documented() {
        let m = parse("if True:\n    def hidden():\n        pass\n\ndef shown():\n    def inner():\n        pass\n");
        let names: Vec<&str> = m.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["shown"]);
    }

    #[test]
    fn string_literal_values() {
        assert_eq!(string_literal_value("'abc'").as_deref(), Some("abc"));
        assert_eq!(string_literal_value("r'a\\nb'").as_deref(), Some("a\\nb"));
        assert_eq!(string_literal_value("\"a\\nb\"").as_deref(), Some("a\nb"));
        assert_eq!(string_literal_value("b'bytes'"), None);
        assert_eq!(string_literal_value("'a' 'b'"), None);
        assert_eq!(string_literal_value("x = 'a'"), None);
    }

    #[test]
    fn comparison_is_not_an_assignment() {
        assert_eq!(find_assign_eq("a == b"), None);
        assert_eq!(find_assign_eq("a: int = 3"), Some(7));
        assert_eq!(find_assign_eq("key=lambda x: x == 1"), Some(3));
    }
}
