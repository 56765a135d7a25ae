//! Numpydoc docstring parser.
//!
//! Splits a cleaned docstring into the fixed section vocabulary. Sections
//! are introduced by a title line underlined with dashes (or `=`); the text
//! before the first section is the summary (first paragraph) and extended
//! summary (everything else).

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

// A first paragraph of the form `name(args)` is a signature, not a summary.
static RE_SIGNATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w., ]+=)?\s*[\w.]+\(.*\)$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocParseError {
    #[error("the section `{0}` appears twice")]
    DuplicateSection(String),
}

/// The sections a docstring can carry, in canonical render order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Summary,
    Attributes,
    Parameters,
    Returns,
    Examples,
    Notes,
    Warnings,
    References,
}

impl SectionKind {
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Summary => "Summary",
            SectionKind::Attributes => "Attributes",
            SectionKind::Parameters => "Parameters",
            SectionKind::Returns => "Returns",
            SectionKind::Examples => "Examples",
            SectionKind::Notes => "Notes",
            SectionKind::Warnings => "Warnings",
            SectionKind::References => "References",
        }
    }
}

/// One `name : type` entry of a Parameters / Returns / Attributes section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldEntry {
    /// Raw header name text, possibly several comma-separated names
    pub names: String,
    /// Raw type text after ` : `, empty when absent
    pub types: String,
    pub description: Vec<String>,
}

impl FieldEntry {
    /// Split the names text into individual names, falling back to a
    /// `name:type` split when no ` : ` type was given.
    pub fn split_names(&self) -> (Vec<String>, String) {
        let (names, types) = match (self.types.is_empty(), self.names.split_once(':')) {
            (true, Some((n, t))) => (n, t.trim().to_string()),
            _ => (self.names.as_str(), self.types.clone()),
        };
        let names = names
            .split(',')
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        (names, types)
    }
}

/// Structured decomposition of a numpydoc docstring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    pub summary: Vec<String>,
    pub extended_summary: Vec<String>,
    pub parameters: Vec<FieldEntry>,
    pub returns: Vec<FieldEntry>,
    pub attributes: Vec<FieldEntry>,
    pub examples: Vec<String>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub references: Vec<String>,
}

/// Parse a cleaned docstring.
pub fn parse(docstring: &str) -> Result<ParsedDoc, DocParseError> {
    let lines: Vec<&str> = docstring.split('\n').collect();
    let mut reader = Reader::new(&lines);
    let mut doc = ParsedDoc::default();
    let mut seen: Vec<String> = Vec::new();
    let mut yields: Vec<FieldEntry> = Vec::new();

    reader.skip_blank();
    parse_summary(&mut reader, &mut doc);

    while !reader.eof() {
        let data = reader.read_to_next_section();
        let Some(first) = data.first() else {
            break;
        };
        let title = normalize_title(first.trim());
        if title.starts_with("..") || data.len() < 2 {
            continue;
        }
        if seen.contains(&title) {
            return Err(DocParseError::DuplicateSection(title));
        }
        seen.push(title.clone());
        let content = strip_blank_lines(&data[2..]);

        match title.as_str() {
            "Parameters" | "Other Parameters" => doc.parameters.extend(parse_fields(&content)),
            "Returns" => doc.returns = parse_fields(&content),
            "Yields" => yields = parse_fields(&content),
            "Attributes" => doc.attributes = parse_fields(&content),
            "Examples" => doc.examples = content,
            "Notes" => doc.notes = content,
            "Warnings" => doc.warnings = content,
            "References" => doc.references = content,
            other => debug!(section = other, "ignoring docstring section"),
        }
    }

    if doc.returns.is_empty() {
        doc.returns = yields;
    }
    Ok(doc)
}

fn parse_summary(reader: &mut Reader<'_>, doc: &mut ParsedDoc) {
    if reader.is_at_section() {
        return;
    }
    loop {
        let summary = reader.read_to_next_empty_line();
        let joined = summary
            .iter()
            .map(|s| s.trim())
            .collect::<Vec<_>>()
            .join(" ");
        if RE_SIGNATURE.is_match(joined.trim()) && !reader.is_at_section() {
            continue;
        }
        doc.summary = summary;
        break;
    }
    if !reader.is_at_section() {
        doc.extended_summary = strip_blank_lines(&reader.read_to_next_section());
    }
}

/// Parse `name : type` headers followed by indented descriptions.
fn parse_fields(content: &[String]) -> Vec<FieldEntry> {
    let lines: Vec<&str> = content.iter().map(String::as_str).collect();
    let mut reader = Reader::new(&lines);
    let mut fields = Vec::new();

    while !reader.eof() {
        let header = reader.read().trim().to_string();
        if header.is_empty() {
            continue;
        }
        let (names, types) = match header.split_once(" : ") {
            Some((n, t)) => (n.trim().to_string(), t.trim().to_string()),
            None => match header.strip_suffix(" :") {
                Some(n) => (n.trim().to_string(), String::new()),
                None => (header, String::new()),
            },
        };
        let description = strip_blank_lines(&dedent(&reader.read_to_next_unindented_line()));
        fields.push(FieldEntry {
            names,
            types,
            description,
        });
    }
    fields
}

fn normalize_title(title: &str) -> String {
    title
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn strip_blank_lines(lines: &[String]) -> Vec<String> {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    match (start, end) {
        (Some(s), Some(e)) => lines[s..=e].to_vec(),
        _ => Vec::new(),
    }
}

fn dedent(lines: &[String]) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or("").trim_end().to_string())
        .collect()
}

/// Line cursor over a docstring.
struct Reader<'a> {
    lines: &'a [&'a str],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(lines: &'a [&'a str]) -> Self {
        Self { lines, pos: 0 }
    }

    fn eof(&self) -> bool {
        self.pos >= self.lines.len()
    }

    fn peek(&self, offset: usize) -> &'a str {
        self.lines.get(self.pos + offset).copied().unwrap_or("")
    }

    fn read(&mut self) -> &'a str {
        let line = self.peek(0);
        self.pos += 1;
        line
    }

    fn skip_blank(&mut self) {
        while !self.eof() && self.peek(0).trim().is_empty() {
            self.pos += 1;
        }
    }

    fn read_to_next_empty_line(&mut self) -> Vec<String> {
        self.skip_blank();
        let mut out = Vec::new();
        while !self.eof() && !self.peek(0).trim().is_empty() {
            out.push(self.read().to_string());
        }
        out
    }

    fn read_to_next_unindented_line(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        while !self.eof() {
            let line = self.peek(0);
            if !line.trim().is_empty() && !line.starts_with(char::is_whitespace) {
                break;
            }
            out.push(self.read().to_string());
        }
        out
    }

    /// Skips blank lines, then reports whether a section title starts here.
    fn is_at_section(&mut self) -> bool {
        self.skip_blank();
        if self.eof() {
            return false;
        }
        let l1 = self.peek(0).trim();
        if l1.starts_with(".. index::") {
            return true;
        }
        let l2 = self.peek(1).trim();
        let width = l1.chars().count();
        width > 0 && (l2.starts_with(&"-".repeat(width)) || l2.starts_with(&"=".repeat(width)))
    }

    fn read_to_next_section(&mut self) -> Vec<String> {
        let mut section = self.read_to_next_empty_line();
        while !self.is_at_section() && !self.eof() {
            if self.pos > 0 && self.lines[self.pos - 1].trim().is_empty() {
                section.push(String::new());
            }
            section.extend(self.read_to_next_empty_line());
        }
        section
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "Compute a thing.

Longer explanation
over two lines, see [1]_.

Parameters
----------
x : int
    The x value.
y, z : str, optional
    Two strings.

Returns
-------
int
    The result.

Examples
--------
>>> compute(1)
2

Notes
-----
Works fast.

References
----------
.. [1] http://example.com";

    #[test]
    fn summary_and_extended_summary() {
        let doc = parse(DOC).unwrap();
        assert_eq!(doc.summary, vec!["Compute a thing."]);
        assert_eq!(
            doc.extended_summary,
            vec!["Longer explanation", "over two lines, see [1]_."]
        );
    }

    #[test]
    fn parameters_are_split_into_fields() {
        let doc = parse(DOC).unwrap();
        assert_eq!(doc.parameters.len(), 2);
        assert_eq!(doc.parameters[0].names, "x");
        assert_eq!(doc.parameters[0].types, "int");
        assert_eq!(doc.parameters[0].description, vec!["The x value."]);
        assert_eq!(doc.parameters[1].names, "y, z");
        assert_eq!(doc.parameters[1].types, "str, optional");
    }

    #[test]
    fn returns_without_colon_keeps_header_as_name() {
        let doc = parse(DOC).unwrap();
        assert_eq!(doc.returns.len(), 1);
        assert_eq!(doc.returns[0].names, "int");
        assert_eq!(doc.returns[0].types, "");
    }

    #[test]
    fn free_text_sections() {
        let doc = parse(DOC).unwrap();
        assert_eq!(doc.examples, vec![">>> compute(1)", "2"]);
        assert_eq!(doc.notes, vec!["Works fast."]);
        assert_eq!(doc.references, vec![".. [1] http://example.com"]);
    }

    #[test]
    fn duplicate_section_is_an_error() {
        let text = "Sum.\n\nNotes\n-----\na\n\nNotes\n-----\nb";
        assert_eq!(
            parse(text).unwrap_err(),
            DocParseError::DuplicateSection("Notes".into())
        );
    }

    #[test]
    fn signature_line_is_not_a_summary() {
        let doc = parse("func(a, b)\n\nReal summary.").unwrap();
        assert_eq!(doc.summary, vec!["Real summary."]);
    }

    #[test]
    fn yields_stand_in_for_returns() {
        let doc = parse("Gen.\n\nYields\n------\nint\n    Numbers.").unwrap();
        assert_eq!(doc.returns[0].names, "int");
    }

    #[test]
    fn section_titles_are_normalized() {
        let doc = parse("Sum.\n\nNOTES\n-----\nshout").unwrap();
        assert_eq!(doc.notes, vec!["shout"]);
    }

    #[test]
    fn split_names_handles_colon_without_spaces() {
        let entry = FieldEntry {
            names: "a, b:int".into(),
            types: String::new(),
            description: vec![],
        };
        assert_eq!(entry.split_names(), (vec!["a".to_string(), "b".to_string()], "int".to_string()));
    }

    #[test]
    fn empty_docstring_is_empty_doc() {
        assert_eq!(parse("").unwrap(), ParsedDoc::default());
    }
}
