//! Entity renderer: one markdown fragment per documented member.
//!
//! A fragment is the heading, an optional fenced signature, a source link,
//! then the docstring sections in a fixed order. Sections that cannot be
//! rendered are skipped and reported on the [`RenderedEntity`]; only a
//! malformed References entry is an error.

use super::{heading, sections, signature, RenderError};
use crate::model::{Entity, Module};
use crate::parser::annotation::TypeContext;
use crate::parser::numpydoc::{self, ParsedDoc, SectionKind};
use tracing::warn;

/// Everything an entity needs from its surroundings.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub types: TypeContext<'a>,
    /// Base URL of the source repository, without a trailing slash
    pub source_location: &'a str,
}

impl<'a> RenderContext<'a> {
    pub fn new(module: &'a Module, source_location: &'a str) -> Self {
        Self {
            types: TypeContext::new(module),
            source_location: source_location.trim_end_matches('/'),
        }
    }
}

/// Why a section (or, with no section, the whole docstring) was left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub section: Option<SectionKind>,
    pub reason: String,
}

#[derive(Debug)]
pub enum SectionOutcome {
    Rendered(Vec<String>),
    Skipped(Skipped),
}

#[derive(Debug, Default)]
pub struct RenderedEntity {
    pub lines: Vec<String>,
    pub skipped: Vec<Skipped>,
}

pub fn render_entity(
    name: &str,
    entity: Entity<'_>,
    depth: usize,
    ctx: &RenderContext<'_>,
) -> Result<RenderedEntity, RenderError> {
    let mut out = RenderedEntity::default();

    let title = match entity {
        Entity::Class(_) => format!("Class **{}**", name),
        Entity::Enum(_) => format!("Enum **{}**", name),
        _ => name.to_string(),
    };
    out.lines.push(heading(depth, &title));
    out.lines.push(String::new());

    if let Some(sig) = entity.signature() {
        out.lines.push("```python".to_string());
        out.lines.push(signature::format_signature(name, sig, &ctx.types));
        out.lines.push("```".to_string());
        out.lines.push(String::new());
    }
    if let Some(link) = source_link(entity, ctx) {
        out.lines.push(link);
        out.lines.push(String::new());
    }

    // signature and enum data still render without a docstring
    let doc = match entity.docstring().map(numpydoc::parse) {
        None => ParsedDoc::default(),
        Some(Ok(doc)) => doc,
        Some(Err(e)) => {
            warn!(entity = name, "docstring not rendered: {e}");
            out.skipped.push(Skipped {
                section: None,
                reason: e.to_string(),
            });
            return Ok(out);
        }
    };

    let signature = entity.signature();
    let types = &ctx.types;
    let outcomes = match entity {
        Entity::Enum(def) => vec![
            SectionOutcome::Rendered(sections::summary(&doc)),
            SectionOutcome::Rendered(sections::members(def, depth)),
            SectionOutcome::Rendered(sections::examples(&doc, depth)),
            SectionOutcome::Rendered(sections::notes(&doc)),
            SectionOutcome::Rendered(sections::warnings(&doc)),
        ],
        _ => {
            let attributes = match entity {
                Entity::Class(class) => sections::attributes(&doc, class, types, depth),
                _ => Vec::new(),
            };
            let returns = match sections::returns(&doc, signature, types, depth) {
                Ok(lines) => SectionOutcome::Rendered(lines),
                Err(e) => SectionOutcome::Skipped(Skipped {
                    section: Some(SectionKind::Returns),
                    reason: e.to_string(),
                }),
            };
            vec![
                SectionOutcome::Rendered(sections::summary(&doc)),
                SectionOutcome::Rendered(attributes),
                SectionOutcome::Rendered(sections::parameters(&doc, signature, types, depth)),
                returns,
                SectionOutcome::Rendered(sections::examples(&doc, depth)),
                SectionOutcome::Rendered(sections::notes(&doc)),
                SectionOutcome::Rendered(sections::warnings(&doc)),
            ]
        }
    };

    for outcome in outcomes {
        match outcome {
            SectionOutcome::Rendered(lines) => out.lines.extend(lines),
            SectionOutcome::Skipped(skip) => {
                let section = skip.section.map_or("docstring", |s| s.title());
                warn!(entity = name, section, "section skipped: {}", skip.reason);
                out.skipped.push(skip);
            }
        }
    }

    let references = sections::references(&doc).map_err(|source| RenderError::Reference {
        entity: name.to_string(),
        source,
    })?;
    out.lines.extend(references);
    Ok(out)
}

/// `Source: [pkg/mod.py](<repo>/pkg/mod.py#L12)`, with `_` escaped in the label.
fn source_link(entity: Entity<'_>, ctx: &RenderContext<'_>) -> Option<String> {
    if ctx.source_location.is_empty() {
        return None;
    }
    let module = ctx.types.module();
    let mut file = module.name.replace('.', "/");
    file.push_str(if module.is_package { "/__init__.py" } else { ".py" });
    Some(format!(
        "Source: [{}]({}/{}#L{})",
        file.replace('_', "\\_"),
        ctx.source_location,
        file,
        entity.line()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, EnumDef, Function, Signature};

    fn module() -> Module {
        Module {
            name: "my_pkg.shapes".into(),
            ..Default::default()
        }
    }

    #[test]
    fn function_fragment_order() {
        let m = module();
        let ctx = RenderContext::new(&m, "https://example.com/repo/");
        let f = Function {
            name: "grow".into(),
            line: 7,
            docstring: Some("Grow it.\n\nNotes\n-----\nSlow.".into()),
            signature: Signature {
                params: vec![],
                returns: Some("int".into()),
            },
            decorators: vec![],
        };
        let out = render_entity("grow", Entity::Function(&f), 2, &ctx).unwrap();
        assert_eq!(
            out.lines,
            vec![
                "## grow",
                "",
                "```python",
                "grow() -> int",
                "```",
                "",
                "Source: [my\\_pkg/shapes.py](https://example.com/repo/my_pkg/shapes.py#L7)",
                "",
                "Grow it.",
                "",
                "### Returns",
                "",
                "- ``int``",
                "",
                "!!! note",
                "    Slow.",
                "",
            ]
        );
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn class_and_enum_headings_are_labelled() {
        let m = module();
        let ctx = RenderContext::new(&m, "");
        let class = Class {
            name: "Shape".into(),
            ..Default::default()
        };
        let out = render_entity("Shape", Entity::Class(&class), 2, &ctx).unwrap();
        assert_eq!(out.lines[0], "## Class **Shape**");
        assert_eq!(out.lines[3], "Shape()");

        let def = EnumDef {
            name: "Color".into(),
            docstring: Some("Colours.".into()),
            members: vec![("RED".into(), "1".into())],
            ..Default::default()
        };
        let out = render_entity("Color", Entity::Enum(&def), 2, &ctx).unwrap();
        assert_eq!(
            out.lines,
            vec!["## Enum **Color**", "", "Colours.", "", "### Members", "", "- `RED`: ``1``", ""]
        );
    }

    #[test]
    fn module_source_link_points_at_line_zero() {
        let m = Module {
            is_package: true,
            docstring: Some("Package.".into()),
            ..module()
        };
        let ctx = RenderContext::new(&m, "https://src");
        let out = render_entity(&m.name, Entity::Module(&m), 1, &ctx).unwrap();
        assert_eq!(out.lines[0], "# my_pkg.shapes");
        assert_eq!(
            out.lines[2],
            "Source: [my\\_pkg/shapes/\\_\\_init\\_\\_.py](https://src/my_pkg/shapes/__init__.py#L0)"
        );
    }

    #[test]
    fn undocumented_enum_still_lists_members() {
        let m = module();
        let ctx = RenderContext::new(&m, "");
        let def = EnumDef {
            name: "Colour".into(),
            members: vec![("RED".into(), "1".into())],
            ..Default::default()
        };
        let out = render_entity("Colour", Entity::Enum(&def), 2, &ctx).unwrap();
        assert_eq!(
            out.lines,
            vec!["## Enum **Colour**", "", "### Members", "", "- `RED`: ``1``", ""]
        );
    }

    #[test]
    fn undocumented_function_keeps_annotated_sections() {
        let m = module();
        let ctx = RenderContext::new(&m, "");
        let mut x = crate::model::Param::new("x", crate::model::ParamKind::Positional);
        x.annotation = Some("int".into());
        let f = Function {
            name: "describe".into(),
            signature: Signature {
                params: vec![x],
                returns: Some("str".into()),
            },
            ..Default::default()
        };
        let out = render_entity("describe", Entity::Function(&f), 2, &ctx).unwrap();
        assert_eq!(
            out.lines,
            vec![
                "## describe",
                "",
                "```python",
                "describe(x: int) -> str",
                "```",
                "",
                "### Parameters",
                "",
                "- `x`: ``int``",
                "",
                "### Returns",
                "",
                "- ``str``",
                "",
            ]
        );
        assert!(out.skipped.is_empty());
    }

    #[test]
    fn unparsable_docstring_degrades_to_header() {
        let m = module();
        let ctx = RenderContext::new(&m, "");
        let f = Function {
            name: "f".into(),
            docstring: Some("F.\n\nNotes\n-----\na\n\nNotes\n-----\nb".into()),
            ..Default::default()
        };
        let out = render_entity("f", Entity::Function(&f), 2, &ctx).unwrap();
        assert_eq!(out.lines, vec!["## f", "", "```python", "f()", "```", ""]);
        assert_eq!(out.skipped[0].section, None);
    }

    #[test]
    fn bad_return_type_skips_only_returns() {
        let m = module();
        let ctx = RenderContext::new(&m, "");
        let f = Function {
            name: "f".into(),
            docstring: Some("F.\n\nReturns\n-------\nx : {1, 2\n\nNotes\n-----\nStill here.".into()),
            ..Default::default()
        };
        let out = render_entity("f", Entity::Function(&f), 2, &ctx).unwrap();
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].section, Some(SectionKind::Returns));
        assert!(!out.lines.iter().any(|l| l.contains("Returns")));
        assert!(out.lines.iter().any(|l| l == "    Still here."));
    }

    #[test]
    fn malformed_reference_is_an_error() {
        let m = module();
        let ctx = RenderContext::new(&m, "");
        let f = Function {
            name: "f".into(),
            docstring: Some("F.\n\nReferences\n----------\nno number here".into()),
            ..Default::default()
        };
        let err = render_entity("f", Entity::Function(&f), 2, &ctx).unwrap_err();
        assert!(matches!(err, RenderError::Reference { .. }));
    }
}
