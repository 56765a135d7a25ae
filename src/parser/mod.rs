//! Parser module: dispatch by file extension.

pub mod annotation;
pub mod numpydoc;
pub mod python;

use crate::discover::DiscoveredModule;
use crate::model::Module;
use anyhow::{anyhow, Context, Result};
use std::path::Path;

/// Parse a source file into a Module based on its extension.
pub fn parse_file(name: &str, path: &Path, content: &str) -> Result<Module> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("py" | "pyi") => python::parse_module(name, path, content)
            .with_context(|| format!("cannot extract {}", path.display())),
        _ => Err(anyhow!("unsupported file type: {}", path.display())),
    }
}

/// Read and parse a discovered module.
pub fn load(module: &DiscoveredModule) -> Result<Module> {
    let content = std::fs::read_to_string(&module.file)
        .with_context(|| format!("cannot read {}", module.file.display()))?;
    parse_file(&module.name, &module.file, &content)
}
