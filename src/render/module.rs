//! Module emitter: the output path and full page text for one module.

use super::entity::{render_entity, RenderContext};
use super::{heading, RenderError};
use crate::model::{Entity, Module};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a module's page goes: `<root>/a/b.md` for a leaf module,
/// `<root>/a/b/index.md` for a package.
pub fn doc_path(module_name: &str, output_root: &Path, is_leaf: bool) -> PathBuf {
    let mut path = output_root.to_path_buf();
    let mut parts = module_name.split('.').peekable();
    while let Some(part) = parts.next() {
        if parts.peek().is_none() && is_leaf {
            path.push(format!("{}.md", part));
        } else {
            path.push(part);
        }
    }
    if !is_leaf {
        path.push("index.md");
    }
    path
}

/// Compute a module's page and make sure its directory exists.
pub fn doc_module(
    module_name: &str,
    module: &Module,
    output_root: &Path,
    source_location: &str,
    is_leaf: bool,
) -> Result<(PathBuf, String), RenderError> {
    let path = doc_path(module_name, output_root, is_leaf);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| RenderError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let text = render_module(module_name, module, source_location)?;
    Ok((path, text))
}

/// Render the page text: title, module fragment, then enums, classes
/// (each with its methods and properties) and functions, sorted by name.
pub fn render_module(
    module_name: &str,
    module: &Module,
    source_location: &str,
) -> Result<String, RenderError> {
    let ctx = RenderContext::new(module, source_location);
    let short_name = module_name.rsplit('.').next().unwrap_or(module_name);
    let mut lines = vec![format!("title: {}", short_name), String::new()];

    if module.docstring.is_some() {
        lines.extend(render_entity(&module.name, Entity::Module(module), 1, &ctx)?.lines);
    } else {
        lines.push(heading(1, &module.name));
        lines.push(String::new());
    }

    let aliases = module.aliases();
    if !aliases.is_empty() {
        debug!(module = %module.name, ?aliases, "re-exported names not documented here");
    }

    let mut enums: Vec<_> = module.enums.iter().filter(|e| is_public(&e.name)).collect();
    enums.sort_by(|a, b| a.name.cmp(&b.name));
    for def in enums {
        lines.extend(render_entity(&def.name, Entity::Enum(def), 2, &ctx)?.lines);
    }

    let mut classes: Vec<_> = module.classes.iter().filter(|c| is_public(&c.name)).collect();
    classes.sort_by(|a, b| a.name.cmp(&b.name));
    for class in classes {
        lines.extend(render_entity(&class.name, Entity::Class(class), 2, &ctx)?.lines);

        let mut methods: Vec<_> = class.methods.iter().filter(|m| is_public(&m.name)).collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        let mut properties: Vec<_> = class.properties.iter().filter(|p| is_public(&p.name)).collect();
        properties.sort_by(|a, b| a.name.cmp(&b.name));

        if methods.is_empty() && properties.is_empty() {
            continue;
        }
        lines.push(heading(3, "Methods"));
        lines.push(String::new());
        for method in methods {
            lines.extend(render_entity(&method.name, Entity::Function(method), 4, &ctx)?.lines);
        }
        for prop in properties {
            lines.extend(render_entity(&prop.name, Entity::Property(prop), 4, &ctx)?.lines);
        }
    }

    let mut functions: Vec<_> = module.functions.iter().filter(|f| is_public(&f.name)).collect();
    functions.sort_by(|a, b| a.name.cmp(&b.name));
    for func in functions {
        lines.extend(render_entity(&func.name, Entity::Function(func), 2, &ctx)?.lines);
    }

    Ok(lines.join("\n"))
}

fn is_public(name: &str) -> bool {
    !name.starts_with('_')
}
