//! Annotation resolution: turns annotation source text into the qualified
//! form a runtime would print, using the module's imports and definitions.

use crate::model::Module;
use regex::Regex;
use std::sync::LazyLock;

static RE_DOTTED_HEAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*").unwrap());

const BUILTINS: &[&str] = &[
    "bool", "bytearray", "bytes", "complex", "dict", "float", "frozenset", "int", "list",
    "memoryview", "object", "range", "set", "slice", "str", "tuple", "type", "BaseException",
    "Exception", "KeyError", "TypeError", "ValueError",
];

/// Resolves annotations in the scope of one module.
#[derive(Debug, Clone, Copy)]
pub struct TypeContext<'a> {
    module: &'a Module,
}

impl<'a> TypeContext<'a> {
    pub fn new(module: &'a Module) -> Self {
        Self { module }
    }

    pub fn module(&self) -> &'a Module {
        self.module
    }

    /// Qualify the head of an annotation; anything after it (a `[...]`
    /// subscript) is kept as written. Unions and other expressions that
    /// do not start with a plain dotted name are returned verbatim.
    pub fn resolve(&self, annotation: &str) -> String {
        let text = unquote(annotation.trim());
        if text == "None" {
            return text.to_string();
        }
        let Some(head) = RE_DOTTED_HEAD.find(text) else {
            return text.to_string();
        };
        let rest = &text[head.end()..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return text.to_string();
        }
        format!("{}{}", self.qualify(head.as_str()), rest)
    }

    fn qualify(&self, name: &str) -> String {
        let (first, remainder) = match name.split_once('.') {
            Some((f, r)) => (f, Some(r)),
            None => (name, None),
        };
        let imported = self
            .module
            .imports
            .iter()
            .rev()
            .find(|i| i.alias == first)
            .map(|i| i.target.as_str());

        match (imported, remainder) {
            (Some(target), Some(r)) => format!("{}.{}", target, r),
            (Some(target), None) => target.to_string(),
            (None, Some(_)) => name.to_string(),
            (None, None) if BUILTINS.contains(&name) => name.to_string(),
            (None, None) if self.module.defines(name) => format!("{}.{}", self.module.name, name),
            (None, None) => name.to_string(),
        }
    }
}

/// Forward references are written as string literals.
fn unquote(text: &str) -> &str {
    for q in ['"', '\''] {
        if text.len() >= 2 && text.starts_with(q) && text.ends_with(q) {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Import};

    fn module() -> Module {
        Module {
            name: "pkg.shapes".into(),
            imports: vec![
                Import {
                    alias: "np".into(),
                    target: "numpy".into(),
                },
                Import {
                    alias: "List".into(),
                    target: "typing.List".into(),
                },
                Import {
                    alias: "Path".into(),
                    target: "pathlib.Path".into(),
                },
            ],
            classes: vec![Class {
                name: "Circle".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn builtins_render_bare() {
        let m = module();
        let ctx = TypeContext::new(&m);
        assert_eq!(ctx.resolve("int"), "int");
        assert_eq!(ctx.resolve("None"), "None");
    }

    #[test]
    fn imported_names_are_qualified() {
        let m = module();
        let ctx = TypeContext::new(&m);
        assert_eq!(ctx.resolve("np.ndarray"), "numpy.ndarray");
        assert_eq!(ctx.resolve("Path"), "pathlib.Path");
        assert_eq!(ctx.resolve("List[int]"), "typing.List[int]");
    }

    #[test]
    fn local_definitions_get_module_prefix() {
        let m = module();
        let ctx = TypeContext::new(&m);
        assert_eq!(ctx.resolve("Circle"), "pkg.shapes.Circle");
        assert_eq!(ctx.resolve("'Circle'"), "pkg.shapes.Circle");
    }

    #[test]
    fn unknown_and_compound_annotations_are_verbatim() {
        let m = module();
        let ctx = TypeContext::new(&m);
        assert_eq!(ctx.resolve("Mystery"), "Mystery");
        assert_eq!(ctx.resolve("int | None"), "int | None");
        assert_eq!(ctx.resolve("other.Thing"), "other.Thing");
    }
}
